//! Data models for the cafespot backend.
//!
//! - `Cafe`, `CafeList`: search, top-places and favorites results
//! - `User`, `Profile`: the signed-in user
//! - Auth wire types: login/register/refresh requests and the token response

pub mod auth;
pub mod cafe;
pub mod user;

pub use auth::{
    AuthResponse, LoginRequest, MessageResponse, PasswordChangeRequest, RefreshRequest,
    RegisterRequest, SearchRequest,
};
pub use cafe::{Cafe, CafeList, FavoritesResponse, OpeningHours, PriceDetail, PriceRange, SearchResponse};
pub use user::{Profile, User};
