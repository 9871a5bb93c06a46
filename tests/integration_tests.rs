//! Integration tests for the configuration system.
//!
//! These tests verify that configuration built through the public API flows
//! into requests and the default transport.

use std::time::Duration;

use bare_connection::clients::{
    ExponentialBackOffPolicy, FormParams, ReqwestConnectionFactory, RestRequest,
    DEFAULT_INITIAL_SLEEP, DEFAULT_MAX_SLEEP, DEFAULT_MULTIPLIER, SC_UNAVAILABLE,
};
use bare_connection::config::{
    DEFAULT_CONNECT_TIMEOUT, DEFAULT_CONTENT_TYPE, DEFAULT_MAX_RETRY_ATTEMPTS,
    DEFAULT_READ_TIMEOUT,
};
use bare_connection::{BaseUrl, Charset, ConfigError, ConnectionProperties, RequestConfig};

#[test]
fn test_full_workflow_build_properties_and_config() {
    let properties = ConnectionProperties::builder()
        .url(BaseUrl::new("https://api.example.com/").unwrap())
        .path("v2/orders")
        .query_param("status", "open")
        .query_param("customer", "Zoë")
        .username("svc")
        .password("pw")
        .authorization_type("Digest")
        .cookie("region=eu")
        .read_timeout(Duration::from_secs(30))
        .follow_redirects(false)
        .build()
        .unwrap();

    assert_eq!(
        properties.request_url(&Charset::utf8()),
        "https://api.example.com/v2/orders?status=open&customer=Zo%C3%AB"
    );
    assert_eq!(
        properties.request_url(&Charset::new("ISO-8859-1").unwrap()),
        "https://api.example.com/v2/orders?status=open&customer=Zo%EB"
    );
    assert_eq!(properties.username(), Some("svc"));
    assert_eq!(properties.authorization_type(), "Digest");
    assert_eq!(properties.cookies(), ["region=eu".to_string()]);
    assert_eq!(properties.connect_timeout(), DEFAULT_CONNECT_TIMEOUT);
    assert_eq!(properties.read_timeout(), Duration::from_secs(30));
    assert!(!properties.follow_redirects());

    let factory = ReqwestConnectionFactory::new(properties)
        .unwrap()
        .with_query_charset(Charset::new("ISO-8859-1").unwrap());
    assert!(factory.url().ends_with("customer=Zo%EB"));
}

#[test]
fn test_defaults_are_applied() {
    let config = RequestConfig::default();
    assert_eq!(config.max_retry_attempts(), DEFAULT_MAX_RETRY_ATTEMPTS);
    assert_eq!(config.max_retry_attempts(), 5);
    assert!(!config.retry_on_transport_error());
    assert_eq!(config.incoming_charset(), &Charset::utf8());
    assert_eq!(config.outgoing_charset(), &Charset::utf8());
    assert_eq!(config.content_type(), DEFAULT_CONTENT_TYPE);

    let properties = ConnectionProperties::builder()
        .url(BaseUrl::new("http://localhost:8080").unwrap())
        .build()
        .unwrap();
    assert_eq!(properties.authorization_type(), "Basic");
    assert_eq!(properties.read_timeout(), DEFAULT_READ_TIMEOUT);
    assert!(properties.follow_redirects());
    assert!(properties.query().is_empty());

    let policy = ExponentialBackOffPolicy::default();
    assert_eq!(policy.initial_delay(), DEFAULT_INITIAL_SLEEP);
    assert_eq!(policy.max_delay(), DEFAULT_MAX_SLEEP);
    assert!((policy.multiplier() - DEFAULT_MULTIPLIER).abs() < f64::EPSILON);
    assert_eq!(
        policy.retry_status_codes().collect::<Vec<_>>(),
        vec![SC_UNAVAILABLE]
    );
}

#[test]
fn test_missing_url_is_rejected() {
    let result = ConnectionProperties::builder().path("orders").build();
    assert!(matches!(
        result,
        Err(ConfigError::MissingRequiredField { field: "url" })
    ));
}

#[test]
fn test_invalid_values_are_rejected() {
    assert!(matches!(
        BaseUrl::new("not a url"),
        Err(ConfigError::InvalidUrl { .. })
    ));
    assert!(matches!(
        Charset::new("utf-99"),
        Err(ConfigError::UnsupportedCharset { .. })
    ));
}

#[test]
fn test_charset_labels_compare_case_insensitively() {
    assert_eq!(Charset::new("utf-8").unwrap(), Charset::utf8());
    assert_eq!(Charset::new(" ISO-8859-1 ").unwrap().name(), "ISO-8859-1");
}

#[test]
fn test_one_config_seeds_independent_requests() {
    let config = RequestConfig::builder()
        .max_retry_attempts(2)
        .outgoing_charset(Charset::new("windows-1252").unwrap())
        .build();

    let requests: Vec<_> = ["alpha", "beta"]
        .into_iter()
        .map(|path| {
            let properties = ConnectionProperties::builder()
                .url(BaseUrl::new("https://api.example.com").unwrap())
                .path(path)
                .build()
                .unwrap();
            RestRequest::builder(ReqwestConnectionFactory::new(properties).unwrap())
                .config(config.clone())
                .build()
        })
        .collect();

    for request in &requests {
        assert_eq!(request.config(), &config);
        assert!(!request.is_executed());
    }
}

#[test]
fn test_form_params_collect_and_encode() {
    let params: FormParams = vec![("a", "1"), ("b", "x y"), ("a", "2")]
        .into_iter()
        .collect();
    assert_eq!(params.len(), 3);
    assert_eq!(params.encode(&Charset::utf8()), "a=1&b=x%20y&a=2");
}
