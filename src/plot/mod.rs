pub mod colormap;
pub mod corner;
