pub mod blur_kernel;
pub mod gpu_backend;
