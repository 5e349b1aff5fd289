pub mod backend_factory;
pub mod gpu_blur_filter;
pub mod software_backend;
#[cfg(test)]
pub(crate) mod test_support;
pub mod wgpu_backend;
