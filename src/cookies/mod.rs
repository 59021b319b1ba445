//! Cookie model and the host cookie-jar boundary.
//!
//! The engine never owns cookies. It sees them through the [`jar::CookieStore`]
//! trait, classifies them with [`category::classify`], and groups them by site
//! with [`psl::site_for`] when reporting statistics.
//!
//! | Type | Responsibility |
//! |------|----------------|
//! | [`Cookie`](canonicalcookie::Cookie) | Single cookie as the host reports it |
//! | [`CookieStore`](jar::CookieStore) | Host jar: list, set, delete, change stream |
//! | [`MemoryCookieJar`](memoryjar::MemoryCookieJar) | In-process jar for tests and demos |
//! | [`CookieCategory`](category::CookieCategory) | Descriptive tag from the classifier |

pub mod canonicalcookie;
pub mod category;
pub mod jar;
pub mod memoryjar;
pub mod psl;

pub use canonicalcookie::{Cookie, CookieKey};
pub use category::CookieCategory;
pub use jar::{ChangeCause, CookieChange, CookieFilter, CookieStore};
pub use memoryjar::MemoryCookieJar;
