use crate::HealthRes;

/// Health check shared by every API surface.
#[derive(Clone, Default)]
pub struct HealthService;

impl HealthService {
    /// Reports the service as alive. There are no downstream dependencies to check.
    pub fn check_health() -> HealthRes {
        HealthRes {
            ok: true,
            message: "CTM is alive".into(),
        }
    }
}
