pub mod filter_kind;
pub mod filter_spec;
pub mod intensity;
pub mod pixel_filter;
