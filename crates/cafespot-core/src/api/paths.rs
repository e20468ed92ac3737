//! Backend endpoint paths, relative to the configured base URL.

pub const AUTH_LOGIN: &str = "/auth/login";
pub const AUTH_REGISTER: &str = "/auth/register";
pub const AUTH_REFRESH: &str = "/auth/refresh";
pub const AUTH_ME: &str = "/auth/me";
pub const AUTH_CHANGE_PASSWORD: &str = "/auth/change-password";

pub const SEARCH: &str = "/search";
pub const SEARCH_TOP_PLACES: &str = "/search/top-places";

pub const FAVORITES: &str = "/favorites/";
pub const FAVORITES_TOGGLE: &str = "/favorites/toggle";
pub const FAVORITES_CHECK: &str = "/favorites/check";

/// Query parameter naming the place for favorites calls.
pub const PLACE_ID_PARAM: &str = "place_id";
