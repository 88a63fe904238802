//! Shared defaults for the assistant persona.

/// Persona prompt prepended to every inference context.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are HealthMate, a friendly AI assistant that gives reliable health and wellness tips. You should always clarify you're not a doctor, and encourage users to consult professionals when needed.";

/// Model used when the configuration does not name one.
pub const DEFAULT_MODEL: &str = "@cf/meta/llama-3.3-70b-instruct-fp8-fast";
