//! Mapping of transport failures onto module errors

use cuebridge_core::ModuleError;
use cuebridge_transport::TransportError;

/// Convert a transport error into the error a module reports to the router
pub fn module_error(e: TransportError) -> ModuleError {
    match e {
        TransportError::ConnectionFailed(msg)
        | TransportError::BindFailed(msg)
        | TransportError::AcceptFailed(msg) => ModuleError::ConnectionFailed(msg),
        TransportError::NotConnected => ModuleError::NotReady("not connected".into()),
        TransportError::InvalidFraming(msg) => ModuleError::InvalidConfig(msg),
        e @ TransportError::MessageTooLarge { .. } => ModuleError::Other(e.to_string()),
        TransportError::Io(e) => ModuleError::Io(e),
        TransportError::SendFailed(msg) => ModuleError::Other(format!("send failed: {}", msg)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_error_mapping() {
        assert!(matches!(
            module_error(TransportError::BindFailed("in use".into())),
            ModuleError::ConnectionFailed(ref m) if m == "in use"
        ));
        assert!(matches!(
            module_error(TransportError::NotConnected),
            ModuleError::NotReady(_)
        ));
        assert!(matches!(
            module_error(TransportError::InvalidFraming("x".into())),
            ModuleError::InvalidConfig(_)
        ));
        assert!(matches!(
            module_error(TransportError::MessageTooLarge { size: 9, max: 8 }),
            ModuleError::Other(ref m) if m.contains("9 > 8")
        ));
    }
}
