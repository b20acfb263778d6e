//! Label codec for service metadata
//!
//! The labels attached to a service's container at creation time are the
//! only record of the dependency graph. Everything an [`Application`] needs
//! to order its services is recovered from them on discovery.
//!
//! [`Application`]: crate::application::Application

use super::descriptor::{Link, Service};
use super::net::NetMode;
use crate::error::{Result, TetherError};
use std::collections::HashMap;

/// Owning application name
pub const LABEL_APP_NAME: &str = "tether.app.name";
/// Service name
pub const LABEL_SERVICE_NAME: &str = "tether.service.name";
/// JSON array of `name:alias` link strings
pub const LABEL_LINKS: &str = "tether.service.links";
/// JSON array of container names
pub const LABEL_VOLUMES_FROM: &str = "tether.service.volumes_from";
/// Network mode string
pub const LABEL_NET: &str = "tether.service.net";

/// Encodes services into container labels and back
pub struct LabelCodec;

impl LabelCodec {
    /// Labels to attach to the service's container
    pub fn encode(service: &Service) -> Result<HashMap<String, String>> {
        let mut labels = HashMap::new();
        labels.insert(LABEL_APP_NAME.to_string(), service.app_name.clone());
        labels.insert(LABEL_SERVICE_NAME.to_string(), service.name.clone());
        labels.insert(
            LABEL_LINKS.to_string(),
            serde_json::to_string(&service.link_specs())?,
        );
        labels.insert(
            LABEL_VOLUMES_FROM.to_string(),
            serde_json::to_string(&service.volumes_from)?,
        );
        labels.insert(LABEL_NET.to_string(), service.net.mode());
        Ok(labels)
    }

    /// Rebuild a service from the labels read off its container
    pub fn decode(labels: &HashMap<String, String>) -> Result<Service> {
        let name = required(labels, LABEL_SERVICE_NAME)?;
        let app_name = required(labels, LABEL_APP_NAME)?;

        let links = string_array(labels, LABEL_LINKS)?
            .iter()
            .map(|spec| {
                spec.parse::<Link>()
                    .map_err(|_| malformed(LABEL_LINKS, &format!("invalid link '{}'", spec)))
            })
            .collect::<Result<Vec<_>>>()?;

        let volumes_from = string_array(labels, LABEL_VOLUMES_FROM)?;
        if volumes_from.iter().any(String::is_empty) {
            return Err(malformed(LABEL_VOLUMES_FROM, "empty container name"));
        }

        let net = match labels.get(LABEL_NET) {
            Some(value) => value
                .parse::<NetMode>()
                .map_err(|_| malformed(LABEL_NET, &format!("unrecognized mode '{}'", value)))?,
            None => NetMode::Bridge,
        };

        Ok(Service {
            name: name.to_string(),
            app_name: app_name.to_string(),
            links,
            volumes_from,
            net,
            image: None,
        })
    }

    /// Label filters selecting an application, or one service within it
    pub fn filters(app_name: &str, service_name: Option<&str>) -> Vec<String> {
        let mut filters = vec![format!("{}={}", LABEL_APP_NAME, app_name)];
        if let Some(service) = service_name {
            filters.push(format!("{}={}", LABEL_SERVICE_NAME, service));
        }
        filters
    }
}

fn malformed(key: &str, reason: &str) -> TetherError {
    TetherError::MalformedMetadata(format!("label '{}': {}", key, reason))
}

fn required<'a>(labels: &'a HashMap<String, String>, key: &str) -> Result<&'a str> {
    labels
        .get(key)
        .map(String::as_str)
        .ok_or_else(|| malformed(key, "missing"))
}

fn string_array(labels: &HashMap<String, String>, key: &str) -> Result<Vec<String>> {
    match labels.get(key) {
        Some(raw) => serde_json::from_str(raw)
            .map_err(|e| malformed(key, &format!("not a JSON string array: {}", e))),
        None => Ok(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_encode_layout() {
        let service = Service::new("web", "shop")
            .link("db", "database")
            .volumes_from("assets")
            .net(NetMode::Host);

        let encoded = LabelCodec::encode(&service).unwrap();
        assert_eq!(encoded[LABEL_APP_NAME], "shop");
        assert_eq!(encoded[LABEL_SERVICE_NAME], "web");
        assert_eq!(encoded[LABEL_LINKS], r#"["db:database"]"#);
        assert_eq!(encoded[LABEL_VOLUMES_FROM], r#"["assets"]"#);
        assert_eq!(encoded[LABEL_NET], "host");
    }

    #[test]
    fn test_round_trip() {
        let services = [
            Service::new("db", "shop"),
            Service::new("web", "shop")
                .link("db", "database")
                .link("cache", "redis")
                .volumes_from("assets")
                .volumes_from("config"),
            Service::new("proxy", "shop").net(NetMode::Container("web".to_string())),
            Service::new("sidecar", "shop").net(NetMode::None),
        ];

        for service in services {
            let decoded = LabelCodec::decode(&LabelCodec::encode(&service).unwrap()).unwrap();
            assert_eq!(decoded, service);
        }
    }

    #[test]
    fn test_every_valid_service_round_trips() {
        let names = [
            "a", "0", "9lives", "web.1", "db_x", "x-y", "A.b_c-9", "", ".", "_", "-", ".hidden",
            "_tmp", "-dash", "a:b", "proj/web", "a b",
        ];
        let aliases = ["db", "alias:with:colons", "x.y"];

        let mut accepted = 0;
        for dep in names {
            let nets = [
                NetMode::Bridge,
                NetMode::None,
                NetMode::Host,
                NetMode::Container(dep.to_string()),
            ];
            for net in nets {
                for alias in aliases {
                    let service = Service::new("svc-1", "shop.app")
                        .link(dep, alias)
                        .volumes_from(dep)
                        .net(net.clone());
                    if service.validate().is_err() {
                        continue;
                    }
                    accepted += 1;

                    let encoded = LabelCodec::encode(&service).unwrap();
                    assert_eq!(LabelCodec::decode(&encoded).unwrap(), service, "{:?}", encoded);
                }
            }
        }
        // 7 valid dependency names x 4 net modes x 3 aliases
        assert_eq!(accepted, 7 * 4 * 3);
    }

    #[test]
    fn test_missing_name_labels() {
        let no_service = labels(&[(LABEL_APP_NAME, "shop")]);
        assert!(matches!(
            LabelCodec::decode(&no_service),
            Err(TetherError::MalformedMetadata(_))
        ));

        let no_app = labels(&[(LABEL_SERVICE_NAME, "web")]);
        assert!(matches!(
            LabelCodec::decode(&no_app),
            Err(TetherError::MalformedMetadata(_))
        ));
    }

    #[test]
    fn test_name_labels_only() {
        let minimal = labels(&[(LABEL_APP_NAME, "shop"), (LABEL_SERVICE_NAME, "web")]);
        let service = LabelCodec::decode(&minimal).unwrap();
        assert_eq!(service, Service::new("web", "shop"));
    }

    #[test]
    fn test_invalid_arrays() {
        let bad_links = labels(&[
            (LABEL_APP_NAME, "shop"),
            (LABEL_SERVICE_NAME, "web"),
            (LABEL_LINKS, "db:database"),
        ]);
        assert!(matches!(
            LabelCodec::decode(&bad_links),
            Err(TetherError::MalformedMetadata(_))
        ));

        let not_strings = labels(&[
            (LABEL_APP_NAME, "shop"),
            (LABEL_SERVICE_NAME, "web"),
            (LABEL_VOLUMES_FROM, "[1, 2]"),
        ]);
        assert!(LabelCodec::decode(&not_strings).is_err());
    }

    #[test]
    fn test_invalid_net() {
        let bad_net = labels(&[
            (LABEL_APP_NAME, "shop"),
            (LABEL_SERVICE_NAME, "web"),
            (LABEL_NET, "overlay"),
        ]);
        assert!(matches!(
            LabelCodec::decode(&bad_net),
            Err(TetherError::MalformedMetadata(_))
        ));
    }

    #[test]
    fn test_filters() {
        assert_eq!(
            LabelCodec::filters("shop", None),
            vec!["tether.app.name=shop".to_string()]
        );
        assert_eq!(
            LabelCodec::filters("shop", Some("web")),
            vec![
                "tether.app.name=shop".to_string(),
                "tether.service.name=web".to_string()
            ]
        );
    }
}
