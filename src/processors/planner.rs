use crate::codec::{highrate_url, strategy_for, NamingStrategy};
use crate::models::{FetchItem, StationRequest, TimeWindow};

/// Enumerates the downloads covering a time window. Pure; no I/O.
pub struct FetchPlanner<'a> {
    archive_base: &'a str,
}

impl<'a> FetchPlanner<'a> {
    pub fn new(archive_base: &'a str) -> Self {
        Self { archive_base }
    }

    /// One item per quarter-hour slot, ascending by (hour, minute). The merge
    /// relies on this order surviving through to fragment collection.
    pub fn plan(&self, request: &StationRequest, window: &TimeWindow) -> Vec<FetchItem> {
        let naming = strategy_for(request.version);
        self.plan_with(naming, request, window)
    }

    pub fn plan_with(
        &self,
        naming: &dyn NamingStrategy,
        request: &StationRequest,
        window: &TimeWindow,
    ) -> Vec<FetchItem> {
        window
            .slots()
            .map(|slot| {
                let file_name = naming.file_name(request, window.year, window.day_of_year, slot);
                let url = highrate_url(
                    self.archive_base,
                    window.year,
                    window.day_of_year,
                    slot.hour,
                    &file_name,
                );
                FetchItem {
                    url,
                    file_name,
                    slot,
                }
            })
            .collect()
    }
}
