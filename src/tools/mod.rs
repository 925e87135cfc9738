pub mod locator;
pub mod process;

pub use locator::{executable_name, ToolLocator};
pub use process::{ExternalTool, ProcessTool, ToolOutput};
