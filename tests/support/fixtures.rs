//! Test fixtures and constants.

/// Grouped parameter payload used across tests.
pub const GROUPED_PAYLOAD: &str = "FOO=bar\nBAR=baz";

/// Secret payload for `prod/app`.
pub const APP_SECRET: &str = r#"{"API_KEY":"sk-live-123","DB_PASSWORD":"from-secret"}"#;

/// Ordinary variables a real process would carry.
pub const ORDINARY_VARS: &[(&str, &str)] = &[
    ("PATH", "/usr/local/bin:/usr/bin"),
    ("HOME", "/home/sbx_user1051"),
    ("LAMBDA_TASK_ROOT", "/var/task"),
    ("EMPTY", ""),
    ("LOOKS_CLOSE", "coldstart-ssm"),
    ("UPPER", "COLDSTART-SSM:/x"),
];

/// Error message AWS returns when the role lacks `ssm:GetParameters`.
pub const ACCESS_DENIED_MESSAGE: &str = "AccessDeniedException: User: arn:aws:sts::123456789012:assumed-role/app/fn is not authorized to perform: ssm:GetParameters";
