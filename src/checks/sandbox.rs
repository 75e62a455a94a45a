use crate::error::HealthCheckError;
use crate::runtime::ContainerRuntime;
use crate::utils::CommandResult;

pub const RUNTIME_CHECK: &str = "Container runtime available";
pub const IMAGE_CHECK: &str = "Sandbox image reachable";

pub fn check_runtime(runtime: &dyn ContainerRuntime) -> Result<(), HealthCheckError> {
    if runtime.is_available() {
        Ok(())
    } else {
        Err(HealthCheckError::RuntimeUnavailable {
            runtime: runtime.program().to_string(),
        })
    }
}

pub fn check_image(runtime: &dyn ContainerRuntime, image: &str) -> Result<(), HealthCheckError> {
    match runtime.run_noop(image) {
        CommandResult::Success(_) => Ok(()),
        other => Err(HealthCheckError::ImageUnreachable {
            image: image.to_string(),
            detail: other.failure_detail(runtime.noop_timeout()),
        }),
    }
}
