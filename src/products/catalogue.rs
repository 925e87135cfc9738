use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::FetchError;

/// Product line: multi-GNSS experiment or operational IGS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Campaign {
    Mgx,
    Ops,
}

/// Latency class of an orbit solution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Solution {
    Final,
    Rapid,
}

impl Campaign {
    pub fn code(&self) -> &'static str {
        match self {
            Campaign::Mgx => "MGX",
            Campaign::Ops => "OPS",
        }
    }
}

impl Solution {
    pub fn code(&self) -> &'static str {
        match self {
            Solution::Final => "FIN",
            Solution::Rapid => "RAP",
        }
    }
}

impl FromStr for Campaign {
    type Err = FetchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "MGX" => Ok(Campaign::Mgx),
            "OPS" => Ok(Campaign::Ops),
            other => Err(FetchError::FatalInput(format!(
                "Unknown campaign '{}'. Expected MGX or OPS",
                other
            ))),
        }
    }
}

impl FromStr for Solution {
    type Err = FetchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "FIN" | "FINAL" => Ok(Solution::Final),
            "RAP" | "RAPID" => Ok(Solution::Rapid),
            other => Err(FetchError::FatalInput(format!(
                "Unknown solution '{}'. Expected FIN or RAP",
                other
            ))),
        }
    }
}

impl fmt::Display for Campaign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl fmt::Display for Solution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProductSpec {
    pub campaign: Campaign,
    pub solution: Solution,
    pub sampling: &'static str,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct AnalysisCenter {
    pub code: &'static str,
    pub name: &'static str,
    pub products: &'static [ProductSpec],
}

impl AnalysisCenter {
    pub fn offers(&self, campaign: Campaign, solution: Solution) -> Option<&ProductSpec> {
        self.products
            .iter()
            .find(|p| p.campaign == campaign && p.solution == solution)
    }
}

const fn spec(campaign: Campaign, solution: Solution, sampling: &'static str) -> ProductSpec {
    ProductSpec {
        campaign,
        solution,
        sampling,
    }
}

use Campaign::{Mgx, Ops};
use Solution::{Final, Rapid};

/// Analysis centres publishing daily SP3 orbits on the archive.
pub const ANALYSIS_CENTERS: &[AnalysisCenter] = &[
    AnalysisCenter {
        code: "COD",
        name: "Center for Orbit Determination in Europe (CODE)",
        products: &[spec(Mgx, Final, "05M"), spec(Ops, Final, "05M"), spec(Ops, Rapid, "05M")],
    },
    AnalysisCenter {
        code: "EMR",
        name: "Natural Resources Canada (NRCan)",
        products: &[spec(Ops, Final, "05M"), spec(Ops, Rapid, "05M")],
    },
    AnalysisCenter {
        code: "ESA",
        name: "European Space Agency (ESA)",
        products: &[spec(Ops, Final, "05M"), spec(Ops, Rapid, "05M")],
    },
    AnalysisCenter {
        code: "GFZ",
        name: "GeoForschungsZentrum (GFZ)",
        products: &[spec(Mgx, Rapid, "05M"), spec(Ops, Final, "05M"), spec(Ops, Rapid, "05M")],
    },
    AnalysisCenter {
        code: "GRG",
        name: "Groupe de Recherche de Geodesie Spatiale (GRGS)",
        products: &[spec(Mgx, Final, "05M"), spec(Ops, Final, "05M"), spec(Ops, Rapid, "05M")],
    },
    AnalysisCenter {
        code: "IAC",
        name: "Information and Analysis Center",
        products: &[spec(Mgx, Final, "05M")],
    },
    AnalysisCenter {
        code: "IGS",
        name: "International GNSS Service (IGS)",
        products: &[spec(Ops, Final, "15M"), spec(Ops, Rapid, "15M")],
    },
    AnalysisCenter {
        code: "JAX",
        name: "Japan Aerospace Exploration Agency (MGEX)",
        products: &[spec(Mgx, Final, "05M")],
    },
    AnalysisCenter {
        code: "JGX",
        name: "Japan Aerospace Exploration Agency (operational)",
        products: &[spec(Ops, Final, "05M"), spec(Ops, Rapid, "05M")],
    },
    AnalysisCenter {
        code: "JPL",
        name: "Jet Propulsion Laboratory (JPL)",
        products: &[spec(Ops, Final, "05M"), spec(Ops, Rapid, "05M")],
    },
    AnalysisCenter {
        code: "MIT",
        name: "Massachusetts Institute of Technology (MIT)",
        products: &[spec(Ops, Final, "05M")],
    },
    AnalysisCenter {
        code: "NGS",
        name: "NOAA National Geodetic Survey (NGS)",
        products: &[spec(Ops, Final, "15M"), spec(Ops, Rapid, "15M")],
    },
    AnalysisCenter {
        code: "SHA",
        name: "Shanghai Astronomical Observatory",
        products: &[spec(Mgx, Rapid, "05M")],
    },
    AnalysisCenter {
        code: "SIO",
        name: "Scripps Institution of Oceanography (SIO)",
        products: &[spec(Ops, Final, "15M"), spec(Ops, Rapid, "15M")],
    },
    AnalysisCenter {
        code: "USN",
        name: "US Naval Observatory (USNO)",
        products: &[spec(Ops, Rapid, "15M")],
    },
    AnalysisCenter {
        code: "WHU",
        name: "Wuhan University (operational)",
        products: &[spec(Ops, Rapid, "05M")],
    },
    AnalysisCenter {
        code: "WUM",
        name: "Wuhan University (MGEX)",
        products: &[spec(Mgx, Final, "05M"), spec(Mgx, Rapid, "05M")],
    },
];

pub fn find_center(code: &str) -> Option<&'static AnalysisCenter> {
    let code = code.trim();
    ANALYSIS_CENTERS
        .iter()
        .find(|c| c.code.eq_ignore_ascii_case(code))
}
