//! Social platform connectors built on the `socialink` OAuth core.
//!
//! # Architecture
//!
//! ```text
//!    UI "Connect" button
//!          ↓
//! GET /api/oauth/:platform/start ──► provider consent page
//!          ↓
//! GET /api/oauth/:platform/callback
//!          ↓
//! ┌─────────────────────────────────────────┐
//! │  AuthorizationFlow (socialink)          │
//! │  consume state → exchange → profile     │
//! │  → encrypt tokens                       │
//! └─────────────────────────────────────────┘
//!          ↓                       ↑
//!     AccountSink        platform adapter (OAuthService
//!                        + ContentPublisher) from the registry
//! ```
//!
//! # Adapters
//!
//! | Platform  | Notes                                             |
//! |-----------|---------------------------------------------------|
//! | Instagram | long-lived tokens, no revocation endpoint         |
//! | TikTok    | `client_key`, video-only publishing, insights     |
//! | Twitter/X | PKCE S256, HTTP Basic client auth                 |
//! | LinkedIn  | OpenID Connect userinfo, `ugcPosts`               |
//! | Facebook  | Graph API v19.0, `fb_exchange_token` renewal      |

pub mod api;
pub mod platforms;
pub mod registry;
pub mod sink;

pub use api::{create_oauth_router, OAuthAppState};
pub use registry::ConnectorRegistry;
pub use sink::{AccountSink, InMemoryAccountSink};
