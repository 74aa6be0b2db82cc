use function_adapter::TypeDescriptor;
use std::env::{args, var};
use tracing::{debug, info};

/// Where payloads that did not come from API Gateway are posted to.
const DEFAULT_EVENT_ROUTE: &str = "/events";

/// A payload read from a local file for a one-off invocation, no runtime involved.
pub struct LocalConfig {
    /// Can be anything as long as it's UTF-8
    pub payload: String,
    /// File name from which the payload was read, as provided in the param
    pub file_name: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// The route that receives non-gateway events, e.g. `/events`
    pub event_route: String,
    /// The input type the handler declares, e.g. `SqsEvent`. Unknown if not set.
    pub input_type: TypeDescriptor,
    /// The output type the handler declares, e.g. `ApiGatewayProxyResponse`. Unknown if not set.
    pub output_type: TypeDescriptor,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            event_route: DEFAULT_EVENT_ROUTE.to_owned(),
            input_type: TypeDescriptor::unknown(),
            output_type: TypeDescriptor::unknown(),
        }
    }
}

impl Config {
    /// Reads `PET_STORE_EVENT_ROUTE`, `PET_STORE_INPUT_TYPE` and `PET_STORE_OUTPUT_TYPE`.
    /// Uses defaults for the ones that are not set.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| var(name).ok())
    }

    /// Same as [Config::from_env] with a custom source of variables.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |name: &str| lookup(name).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());

        let config = Self {
            event_route: non_empty("PET_STORE_EVENT_ROUTE").unwrap_or(defaults.event_route),
            input_type: non_empty("PET_STORE_INPUT_TYPE").map_or(defaults.input_type, TypeDescriptor::named),
            output_type: non_empty("PET_STORE_OUTPUT_TYPE").map_or(defaults.output_type, TypeDescriptor::named),
        };

        info!(
            "Event route: {}, input type: {}, output type: {}",
            config.event_route,
            config.input_type.name().unwrap_or("unknown"),
            config.output_type.name().unwrap_or("unknown")
        );

        config
    }
}

/// Reads the payload from a local file if the file name is provided in the command line arguments.
/// Returns None if there is no file name, exits after printing the usage for `--help`.
pub fn get_local_payload() -> Result<Option<LocalConfig>, std::io::Error> {
    debug!("Args: {}", args().collect::<Vec<String>>().join(" "));

    let Some(payload_file) = args().nth(1) else {
        return Ok(None);
    };

    if payload_file == "--help" {
        println!("A sample pet store running inside AWS Lambda.");
        println!();
        println!("Under the Lambda runtime: pet-store-lambda");
        println!("With a local payload: pet-store-lambda [payload_file], e.g. pet-store-lambda get-pets.json");
        println!();
        println!("Env vars: PET_STORE_EVENT_ROUTE, PET_STORE_INPUT_TYPE, PET_STORE_OUTPUT_TYPE, RUST_LOG");

        std::process::exit(0);
    }

    let payload = std::fs::read_to_string(&payload_file)?;

    Ok(Some(LocalConfig {
        payload,
        file_name: payload_file,
    }))
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults() {
        let config = Config::from_lookup(|_| None);
        assert_eq!(config.event_route, "/events");
        assert_eq!(config.input_type.name(), None);
        assert_eq!(config.output_type.name(), None);
    }

    #[test]
    fn vars_override_defaults() {
        let vars = HashMap::from([
            ("PET_STORE_EVENT_ROUTE", "/inbox"),
            ("PET_STORE_INPUT_TYPE", "KinesisEvent"),
            ("PET_STORE_OUTPUT_TYPE", " "),
        ]);
        let config = Config::from_lookup(|name| vars.get(name).map(|v| v.to_string()));

        assert_eq!(config.event_route, "/inbox");
        assert_eq!(config.input_type.name(), Some("KinesisEvent"));
        // blank is the same as not set
        assert_eq!(config.output_type.name(), None);
    }
}
