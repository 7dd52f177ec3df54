//! REST API module
//!
//! HTTP access to the treasury. The server runs as the operator wallet,
//! which must be the controller of the latest deployment for top-ups,
//! sweeps and role changes to succeed.
//!
//! # Endpoints
//!
//! ## Treasury
//! - `GET /api/treasury` - Balance, controller, minters
//! - `POST /api/treasury/deposit` - Fund the treasury
//! - `POST /api/treasury/topup` - Top up under-threshold wallets
//! - `POST /api/treasury/sweep` - Move value out
//!
//! ## Roles
//! - `POST /api/minters` - Grant minter
//! - `DELETE /api/minters/{address}` - Revoke minter
//!
//! ## Users
//! - `GET /api/users`, `POST /api/users` - List / register
//! - `GET /api/users/{username}` - User detail
//! - `POST /api/users/{username}/mint` - Mint a token to the user
//! - `POST /api/users/{username}/checkin` - Record a check-in
//!
//! ## Balances
//! - `GET /api/balances/{address}`
//!
//! ## WebSocket
//! - `GET /ws` - Real-time updates (TreasuryFunded, TopUpCompleted, Swept, Minted, CheckedIn)

pub mod handlers;
pub mod routes;
pub mod websocket;

pub use handlers::ApiState;
pub use routes::create_router;
pub use websocket::{WsBroadcaster, WsEvent};
