pub mod execute;
pub mod gate;
pub mod intent;
pub mod narrator;
pub mod post_filter;
pub mod route;
pub mod score;
