use serde::Serialize;
use serde_json::Value;

use crate::API_VERSION;
use crate::error::{ClientError, ClientResult};

#[derive(Debug, Clone, Serialize)]
pub struct SuccessEnvelope {
    pub ok: bool,
    pub command: String,
    pub version: String,
    pub data: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailureEnvelope {
    pub ok: bool,
    pub error: ErrorContract,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorContract {
    pub code: String,
    pub message: String,
    pub recovery_steps: Vec<String>,
}

pub fn success<T>(command: &str, data: T) -> ClientResult<SuccessEnvelope>
where
    T: Serialize,
{
    let json_data = serde_json::to_value(data)
        .map_err(|err| ClientError::internal_serialization(&err.to_string()))?;
    Ok(SuccessEnvelope {
        ok: true,
        command: command.to_string(),
        version: API_VERSION.to_string(),
        data: json_data,
    })
}

pub fn failure_from_error(error: &ClientError) -> FailureEnvelope {
    FailureEnvelope {
        ok: false,
        error: ErrorContract {
            code: error.code.clone(),
            message: error.message.clone(),
            recovery_steps: error.recovery_steps.clone(),
        },
        data: error.data.clone(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{failure_from_error, success};
    use crate::ClientError;
    use crate::import::DuplicatePolicy;

    #[test]
    fn success_carries_command_and_version() {
        let envelope = success("import list", json!({"rows": []}));
        assert!(envelope.is_ok());
        if let Ok(envelope) = envelope {
            assert!(envelope.ok);
            assert_eq!(envelope.command, "import list");
            assert_eq!(envelope.version, crate::API_VERSION);
            assert_eq!(envelope.data, json!({"rows": []}));
        }
    }

    #[test]
    fn enums_serialize_as_their_flag_values() {
        let envelope = success("import run", DuplicatePolicy::Include);
        assert!(envelope.is_ok());
        if let Ok(envelope) = envelope {
            assert_eq!(envelope.data, json!("include"));
        }
    }

    #[test]
    fn failure_keeps_recovery_steps_and_data() {
        let error = ClientError::unknown_entity("pets", &["expenses"]);
        let envelope = failure_from_error(&error);
        assert!(!envelope.ok);
        assert_eq!(envelope.error.code, "unknown_entity");
        assert_eq!(envelope.error.recovery_steps.len(), 2);
        assert!(envelope.data.is_some());
    }
}
