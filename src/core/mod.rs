pub mod axis;
pub mod density;
pub mod ftest;
pub mod special;
pub mod spline;
