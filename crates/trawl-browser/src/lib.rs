//! CDP (Chrome DevTools Protocol) page driver for the trawl interpreter.
//!
//! Implements the engine's `PageDriver` trait over a raw CDP WebSocket
//! connection to a page target:
//!
//! - Navigation and readiness polling (`Page.navigate`, `document.readyState`)
//! - JavaScript evaluation (`Runtime.evaluate`)
//! - Trusted clicks (`DOM.getBoxModel` + `Input.dispatchMouseEvent`) with a
//!   synthetic-click force fallback
//! - Typing and key presses (`DOM.focus` + `Input.dispatchKeyEvent`)
//! - Cookie jar reads (`Network.getCookies`)
//! - Request blocking (`Network.setBlockedURLs`)
//! - Screenshots (`Page.captureScreenshot`)
//! - Popup discovery (`Target.setDiscoverTargets` + `Target.targetCreated`)
//!   and sibling page creation (`Target.createTarget`)
//!
//! # Chrome Setup
//!
//! Chrome must run with `--remote-debugging-port`:
//!
//! ```sh
//! chromium --remote-debugging-port=9222
//! ```
//!
//! Page WebSocket URLs come from the browser's `/json` endpoint and look
//! like `ws://127.0.0.1:9222/devtools/page/<target-id>`.
//!
//! # Example (conceptual)
//!
//! ```ignore
//! use trawl_browser::CdpPage;
//!
//! let page = CdpPage::connect("ws://127.0.0.1:9222/devtools/page/ABC").await?;
//! interpreter.run(page, None).await?;
//! ```

pub mod cdp;
pub mod error;
pub mod page;

pub use cdp::{CdpClient, CdpEvent};
pub use error::BrowserError;
pub use page::CdpPage;
