use async_trait::async_trait;
use havruta_core::PermissionError;

/// Snapshot of microphone permission, passed explicitly to every consumer.
/// There is no ambient/global permission lookup.
#[derive(Debug, Clone, Default)]
pub struct MicrophonePermission {
    granted: bool,
    error: Option<PermissionError>,
}

impl MicrophonePermission {
    pub fn granted() -> Self {
        Self {
            granted: true,
            error: None,
        }
    }

    pub fn denied(error: PermissionError) -> Self {
        Self {
            granted: false,
            error: Some(error),
        }
    }

    pub fn is_granted(&self) -> bool {
        self.granted
    }

    pub fn error(&self) -> Option<&PermissionError> {
        self.error.as_ref()
    }

    /// User-facing status text when the microphone is unavailable.
    pub fn user_message(&self) -> Option<&'static str> {
        self.error.as_ref().map(PermissionError::user_message)
    }
}

/// Asynchronous grant/denial check against the host microphone stack.
#[async_trait]
pub trait PermissionProbe: Send + Sync {
    async fn request(&self) -> Result<(), PermissionError>;
}

/// Run the probe and fold its outcome into a permission snapshot.
pub async fn request_microphone(probe: &dyn PermissionProbe) -> MicrophonePermission {
    match probe.request().await {
        Ok(()) => {
            tracing::debug!("microphone permission granted");
            MicrophonePermission::granted()
        }
        Err(error) => {
            tracing::warn!("microphone permission unavailable: {error}");
            MicrophonePermission::denied(error)
        }
    }
}

/// Probe with a fixed answer, for hosts without a real microphone stack
/// and for tests.
pub struct StaticProbe {
    result: Result<(), PermissionError>,
}

impl StaticProbe {
    pub fn granted() -> Self {
        Self { result: Ok(()) }
    }

    pub fn failing(error: PermissionError) -> Self {
        Self { result: Err(error) }
    }
}

#[async_trait]
impl PermissionProbe for StaticProbe {
    async fn request(&self) -> Result<(), PermissionError> {
        self.result.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_granted_probe_yields_granted_permission() {
        let permission = request_microphone(&StaticProbe::granted()).await;
        assert!(permission.is_granted());
        assert!(permission.error().is_none());
        assert!(permission.user_message().is_none());
    }

    #[tokio::test]
    async fn test_denied_probe_yields_mapped_message() {
        let permission = request_microphone(&StaticProbe::failing(PermissionError::Denied)).await;
        assert!(!permission.is_granted());
        assert_eq!(
            permission.user_message(),
            Some("마이크 사용 권한이 거부되었습니다. 브라우저 설정에서 권한을 허용해주세요.")
        );
    }

    #[tokio::test]
    async fn test_distinct_failure_reasons_keep_distinct_messages() {
        let not_found = request_microphone(&StaticProbe::failing(PermissionError::NotFound)).await;
        let not_readable =
            request_microphone(&StaticProbe::failing(PermissionError::NotReadable)).await;
        assert_ne!(not_found.user_message(), not_readable.user_message());
    }

    #[test]
    fn test_default_permission_is_ungranted_without_error() {
        let permission = MicrophonePermission::default();
        assert!(!permission.is_granted());
        assert!(permission.error().is_none());
    }
}
