//! The four UI checks
//!
//! Each check is an independent async function over the shared page.
//! Assertion failures surface as `SmokeError::AssertionFailed` and are
//! converted to a FAIL outcome at the runner's per-check boundary; only
//! the coin-selector check can legitimately return `Outcome::Skip`.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{debug, info};

use crate::driver::PageDriver;
use crate::error::{SmokeError, SmokeResult};

pub const HOMEPAGE_ELEMENTS: &str = "Homepage Elements";
pub const PRICES_LOAD: &str = "Prices Load";
pub const THEME_TOGGLE: &str = "Theme Toggle";
pub const COIN_SELECTOR: &str = "Coin Selector";

const NAV_TIMEOUT: Duration = Duration::from_secs(120);
const IDLE_TIMEOUT: Duration = Duration::from_secs(60);
const CLICK_TIMEOUT: Duration = Duration::from_secs(5);

/// Fixed settle delay for the in-page price fetch. Deliberately a plain
/// sleep rather than a condition wait, matching the observed timing
/// behavior of the suite this runner replaces.
const PRICE_SETTLE: Duration = Duration::from_secs(5);

/// Fixed settle delay after clicking a toggle or selector.
const UI_SETTLE: Duration = Duration::from_millis(500);

const THEME_TOGGLE_SELECTOR: &str = r#"button[aria-label*="mode"]"#;

/// Fallback used when the root element carries no data-theme attribute.
/// The same fallback is applied to both reads, so an attribute that is
/// absent before and after the click compares equal and fails the check.
const THEME_FALLBACK: &str = "dark";

/// Outcome of a single check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "message", rename_all = "lowercase")]
pub enum Outcome {
    Pass,
    Fail(String),
    Skip,
}

impl Outcome {
    pub fn is_fail(&self) -> bool {
        matches!(self, Outcome::Fail(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Pass => "PASS",
            Outcome::Fail(_) => "FAIL",
            Outcome::Skip => "SKIP",
        }
    }
}

/// Shared inputs for the checks
#[derive(Debug, Clone)]
pub struct CheckContext {
    pub base_url: String,
    pub screenshot_dir: PathBuf,
}

impl CheckContext {
    fn shot(&self, name: &str) -> PathBuf {
        self.screenshot_dir.join(format!("{}.png", name))
    }
}

/// Structural elements are present on the homepage
pub async fn homepage_elements(page: &PageDriver, cx: &CheckContext) -> SmokeResult<Outcome> {
    debug!("Navigating to homepage");
    page.goto(&cx.base_url, None, NAV_TIMEOUT).await?;
    page.wait_for_load("networkidle", IDLE_TIMEOUT).await?;

    assert_visible(page, "header", "Header").await?;
    assert_visible(page, r#"h1:has-text("Crypto")"#, "App title").await?;
    assert_visible(page, THEME_TOGGLE_SELECTOR, "Theme toggle").await?;
    assert_visible(page, r#"h2:has-text("Current Prices")"#, "Current Prices heading").await?;
    assert_visible(page, r#"button:has-text("What's Up")"#, "What's Up button").await?;

    page.screenshot(&cx.shot("homepage"), true).await?;
    Ok(Outcome::Pass)
}

/// Asynchronously fetched price data populates the table
pub async fn prices_load(page: &PageDriver, cx: &CheckContext) -> SmokeResult<Outcome> {
    debug!("Waiting for prices to load");
    sleep(PRICE_SETTLE).await;

    let count = page.count(".data-cell").await?;
    info!("Found {} price cells", count);
    if count == 0 {
        return Err(SmokeError::AssertionFailed(
            "Should have at least one price cell".to_string(),
        ));
    }
    if !page.is_visible(".data-cell").await? {
        return Err(SmokeError::AssertionFailed(
            "Price cell should be visible".to_string(),
        ));
    }

    page.screenshot(&cx.shot("prices_loaded"), true).await?;
    Ok(Outcome::Pass)
}

/// Clicking the theme toggle flips the document theme attribute
pub async fn theme_toggle(page: &PageDriver, cx: &CheckContext) -> SmokeResult<Outcome> {
    if !page.is_visible(THEME_TOGGLE_SELECTOR).await? {
        return Err(SmokeError::AssertionFailed(
            "Theme toggle should be visible".to_string(),
        ));
    }

    let initial = theme_or_default(page.get_attribute("html", "data-theme").await?);
    info!("Initial theme: '{}'", initial);

    debug!("Clicking theme toggle");
    page.click(THEME_TOGGLE_SELECTOR, CLICK_TIMEOUT).await?;
    sleep(UI_SETTLE).await;

    let toggled = theme_or_default(page.get_attribute("html", "data-theme").await?);
    info!("New theme: '{}'", toggled);

    if initial == toggled {
        return Err(SmokeError::AssertionFailed(format!(
            "Theme should change from '{}' to something else",
            initial
        )));
    }

    page.screenshot(&cx.shot("theme_toggled"), true).await?;
    Ok(Outcome::Pass)
}

/// Coin selector opens a dropdown; SKIP when the control is absent
pub async fn coin_selector(page: &PageDriver, cx: &CheckContext) -> SmokeResult<Outcome> {
    const SELECTOR: &str = r#"button:has-text("coins"), button:has-text("Coins")"#;

    if page.count(SELECTOR).await? == 0 || !page.is_visible(SELECTOR).await? {
        info!("Coin selector not found (may be hidden), skipping");
        return Ok(Outcome::Skip);
    }

    debug!("Clicking coin selector");
    page.click(SELECTOR, CLICK_TIMEOUT).await?;
    sleep(UI_SETTLE).await;

    let dropdowns = page
        .count(r#"[role="listbox"], .dropdown, [class*="dropdown"]"#)
        .await?;
    if dropdowns > 0 {
        info!("Coin selector dropdown opened");
        page.screenshot(&cx.shot("coin_selector"), true).await?;
    }

    // Dismiss by clicking an unrelated point on the page.
    page.click_at("body", 10, 10).await?;
    Ok(Outcome::Pass)
}

async fn assert_visible(page: &PageDriver, selector: &str, what: &str) -> SmokeResult<()> {
    debug!("Testing {}", what);
    if !page.is_visible(selector).await? {
        return Err(SmokeError::AssertionFailed(format!(
            "{} should be visible",
            what
        )));
    }
    Ok(())
}

fn theme_or_default(attr: Option<String>) -> String {
    attr.unwrap_or_else(|| THEME_FALLBACK.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_outcome_classification() {
        assert!(Outcome::Fail("boom".to_string()).is_fail());
        assert!(!Outcome::Pass.is_fail());
        assert!(!Outcome::Skip.is_fail());
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(Outcome::Pass.label(), "PASS");
        assert_eq!(Outcome::Fail("x".to_string()).label(), "FAIL");
        assert_eq!(Outcome::Skip.label(), "SKIP");
    }

    #[test]
    fn test_outcome_serialization() {
        let json = serde_json::to_string(&Outcome::Fail("no cells".to_string())).unwrap();
        assert_eq!(json, r#"{"status":"fail","message":"no cells"}"#);

        let json = serde_json::to_string(&Outcome::Pass).unwrap();
        assert_eq!(json, r#"{"status":"pass"}"#);
    }

    #[test]
    fn test_theme_fallback_is_symmetric() {
        // Attribute absent on both reads must compare equal, so the
        // "theme changed" assertion fails rather than trivially passing.
        assert_eq!(theme_or_default(None), theme_or_default(None));
        assert_eq!(theme_or_default(None), "dark");
        assert_ne!(
            theme_or_default(Some("light".to_string())),
            theme_or_default(None)
        );
    }

    #[test]
    fn test_screenshot_paths() {
        let cx = CheckContext {
            base_url: "http://localhost:3000".to_string(),
            screenshot_dir: PathBuf::from("tests/screenshots"),
        };
        assert_eq!(
            cx.shot("homepage"),
            Path::new("tests/screenshots/homepage.png")
        );
    }
}
