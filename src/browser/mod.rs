pub mod chrome;
pub mod driver;

pub use chrome::{ChromeDriver, ChromeLauncher};
pub use driver::{BrowserDriver, DriverFactory};
