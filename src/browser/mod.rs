pub mod driver;
pub mod headless;

pub use driver::{ChromeDriver, PageDriver};
pub use headless::{launch_browser, LaunchOptions};
