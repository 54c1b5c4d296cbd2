use docsift_core::{
    ConfigError, CrawlSettings, FilterPolicy, FilterSettings, LlmSettings,
};
use pretty_assertions::assert_eq;

#[test]
fn crawl_defaults() {
    let settings = CrawlSettings::default();
    assert_eq!(settings.max_depth, 2);
    assert_eq!(settings.max_pages, 25);
    assert!(!settings.include_external);
    assert!(settings.keywords.is_empty());
    assert_eq!(settings.keyword_weight, 0.7);
    assert_eq!(settings.validate(), Ok(()));
}

#[test]
fn crawl_validation_rejects_bad_limits() {
    let settings = CrawlSettings {
        max_depth: 0,
        ..CrawlSettings::default()
    };
    assert_eq!(settings.validate(), Err(ConfigError::MaxDepth));

    let settings = CrawlSettings {
        max_pages: 0,
        ..CrawlSettings::default()
    };
    assert_eq!(settings.validate(), Err(ConfigError::MaxPages));

    let settings = CrawlSettings {
        keyword_weight: 1.5,
        ..CrawlSettings::default()
    };
    assert_eq!(settings.validate(), Err(ConfigError::KeywordWeight(1.5)));
}

#[test]
fn llm_defaults_and_model_name() {
    let settings = LlmSettings::default();
    assert_eq!(settings.provider, "openai/gpt-4o");
    assert_eq!(settings.temperature, 0.1);
    assert_eq!(settings.model_name(), "gpt-4o");
    assert!(!settings.is_reasoning_model());
    assert!(!settings.instruction.is_empty());
    assert_eq!(settings.validate("extraction"), Ok(()));
}

#[test]
fn provider_without_vendor_is_its_own_model() {
    let settings = LlmSettings {
        provider: "o1-mini".to_string(),
        ..LlmSettings::default()
    };
    assert_eq!(settings.model_name(), "o1-mini");
    assert!(settings.is_reasoning_model());
}

#[test]
fn llm_validation_failures() {
    let settings = LlmSettings {
        provider: String::new(),
        ..LlmSettings::default()
    };
    assert_eq!(
        settings.validate("filter"),
        Err(ConfigError::EmptyProvider { role: "filter" })
    );

    let settings = LlmSettings {
        temperature: 1.5,
        ..LlmSettings::default()
    };
    assert!(matches!(
        settings.validate("extraction"),
        Err(ConfigError::Temperature { .. })
    ));

    let settings = LlmSettings {
        instruction: "  ".to_string(),
        ..LlmSettings::default()
    };
    assert_eq!(
        settings.validate("extraction"),
        Err(ConfigError::EmptyInstruction)
    );
}

#[test]
fn filtering_without_topic_is_a_config_error() {
    let settings = FilterSettings {
        enabled: true,
        target_topic: None,
        policy: FilterPolicy::Binary,
    };
    let err = settings.validate().unwrap_err();
    assert_eq!(err, ConfigError::MissingTargetTopic);
    assert!(err.to_string().contains("--target-topic is required"));

    let blank = FilterSettings {
        enabled: true,
        target_topic: Some("   ".to_string()),
        policy: FilterPolicy::Binary,
    };
    assert_eq!(blank.validate(), Err(ConfigError::MissingTargetTopic));
}

#[test]
fn topic_without_filtering_is_inactive() {
    let settings = FilterSettings {
        enabled: false,
        target_topic: Some("Python SDK".to_string()),
        policy: FilterPolicy::Binary,
    };
    assert_eq!(settings.validate(), Ok(()));
    assert_eq!(settings.active_topic(), None);
}

#[test]
fn threshold_policy_is_range_checked() {
    let settings = FilterSettings {
        enabled: true,
        target_topic: Some("Python SDK".to_string()),
        policy: FilterPolicy::Threshold(1.2),
    };
    assert_eq!(
        settings.validate(),
        Err(ConfigError::RelevanceThreshold(1.2))
    );
}
