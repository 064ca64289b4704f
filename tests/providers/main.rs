mod anthropic_test;
mod support;
mod telemetry_test;
