use sqx_config::{PatchConfig, Section};
use sqx_patch::{PatchAction, PatchOptions, apply_patch, unified_diff, verify};
use sqx_xml::{XmlDocument, XmlPath, load_bytes, parse};

const TEMPLATE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<!-- Mean reversal template -->
<Strategy>
    <BuildTradingOptions>
        <Params></Params>
    </BuildTradingOptions>
    <BuildMode>
        <generationType>genetic-evolution</generationType>
        <PopulationSize>100</PopulationSize>
        <MaxGenerations>25</MaxGenerations>
    </BuildMode>
    <SLPTOptions>
        <MinSLInPips>10</MinSLInPips>
        <MaxSLInPips>50</MaxSLInPips>
    </SLPTOptions>
    <Symbol>EURUSD_H1</Symbol>
    <Data>
        <From>2020-01-01</From>
        <To>2024-12-31</To>
    </Data>
    <BacktestSettings>
        <TestPrecision>15</TestPrecision>
        <Spread>1</Spread>
        <Slippage>0</Slippage>
    </BacktestSettings>
    <FilterParams>
        <Conditions>
            <Condition use="false">
                <Left-Side><Column-Value column="NetProfit" sampleType="10"/></Left-Side>
                <Right-Side><Numeric-Value value="0"/></Right-Side>
            </Condition>
            <Condition use="false">
                <Left-Side><Column-Value column="NumberOfTrades" sampleType="20"/></Left-Side>
                <Right-Side><Numeric-Value value="0"/></Right-Side>
            </Condition>
        </Conditions>
    </FilterParams>
</Strategy>
"#;

fn full_config() -> PatchConfig {
    PatchConfig::new()
        .with_entry(Section::TradingOptions, "MaxTradesPerDay", 6)
        .with_entry(Section::TradingOptions, "DontTradeOnWeekends", true)
        .with_entry(Section::BuildMode, "PopulationSize", 200)
        .with_entry(Section::BuildMode, "MaxGenerations", 50)
        .with_entry(Section::BuildMode, "Islands", 4)
        .with_entry(Section::Slpt, "MinSLInPips", 5)
        .with_entry(Section::Slpt, "MaxSLInPips", 25)
        .with_entry(Section::DataSetup, "symbol", "EURUSD")
        .with_entry(Section::DataSetup, "timeframe", "M15")
        .with_entry(Section::DataSetup, "date_from", "2020-04-17")
        .with_entry(Section::DataSetup, "date_to", "2025-04-18")
        .with_entry(Section::DataSetup, "spread", 2)
        .with_entry(Section::DataSetup, "slippage", 1)
        .with_entry(Section::Conditions, "NetProfit_IS", 1000)
        .with_entry(Section::Conditions, "NumberOfTrades_OOS", 50)
}

fn text_at(doc: &XmlDocument, expression: &str) -> Option<String> {
    XmlPath::parse(expression).unwrap().find(&doc.root)?.text()
}

#[test]
fn test_keyed_param_inserted_into_empty_params() {
    let mut doc = parse(TEMPLATE).unwrap();
    let config = PatchConfig::new().with_entry(Section::TradingOptions, "MaxTradesPerDay", 6);

    apply_patch(&mut doc, &config, &PatchOptions::default());

    let params = XmlPath::parse(".//BuildTradingOptions/Params")
        .unwrap()
        .find(&doc.root)
        .unwrap();
    let children: Vec<_> = params.elements().collect();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].attribute("key"), Some("MaxTradesPerDay"));
    assert_eq!(children[0].attribute("class"), Some("Generic"));
    assert_eq!(children[0].text().as_deref(), Some("6"));
}

#[test]
fn test_existing_tag_overwritten_without_sibling() {
    let mut doc = parse(TEMPLATE).unwrap();
    let config = PatchConfig::new().with_entry(Section::BuildMode, "PopulationSize", 200);

    apply_patch(&mut doc, &config, &PatchOptions::default());

    let build_mode = XmlPath::descendant("BuildMode").find(&doc.root).unwrap();
    let sizes: Vec<_> = build_mode
        .elements()
        .filter(|e| e.name == "PopulationSize")
        .map(|e| e.text())
        .collect();
    assert_eq!(sizes, [Some("200".to_string())]);
}

#[test]
fn test_missing_tag_appended_with_indentation() {
    let mut doc = parse(TEMPLATE).unwrap();
    let config = PatchConfig::new().with_entry(Section::BuildMode, "Islands", 4);

    apply_patch(&mut doc, &config, &PatchOptions::default());

    assert!(doc.to_xml_string().contains(
        "        <MaxGenerations>25</MaxGenerations>\n        <Islands>4</Islands>\n    </BuildMode>"
    ));
}

#[test]
fn test_full_config_round_trip() {
    let mut doc = parse(TEMPLATE).unwrap();
    let config = full_config();

    let report = apply_patch(&mut doc, &config, &PatchOptions::default());
    assert_eq!(report.skipped_count(), 0, "{:?}", report.skipped().collect::<Vec<_>>());

    // Reload from the serialized bytes, as a committed output would be
    let reloaded = load_bytes(&doc.to_bytes()).unwrap();
    assert_eq!(verify(&reloaded, &config), Ok(()));

    assert_eq!(
        text_at(
            &reloaded,
            ".//BuildTradingOptions/Params/Param[@key='MaxTradesPerDay']"
        )
        .as_deref(),
        Some("6")
    );
    assert_eq!(
        text_at(&reloaded, ".//Params/Param[@key='DontTradeOnWeekends']").as_deref(),
        Some("True")
    );
    assert_eq!(text_at(&reloaded, ".//BuildMode/Islands").as_deref(), Some("4"));
    assert_eq!(text_at(&reloaded, ".//SLPTOptions/MaxSLInPips").as_deref(), Some("25"));
    assert_eq!(text_at(&reloaded, ".//Symbol").as_deref(), Some("EURUSD_M15"));
    assert_eq!(text_at(&reloaded, ".//Data/To").as_deref(), Some("2025-04-18"));
    assert_eq!(text_at(&reloaded, ".//BacktestSettings/Slippage").as_deref(), Some("1"));

    let out = reloaded.to_xml_string();
    assert!(out.starts_with(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<!-- Mean reversal template -->\n"
    ));
    assert!(out.contains(
        r#"<Condition use="true">
                <Left-Side><Column-Value column="NetProfit" sampleType="10"/></Left-Side>
                <Right-Side><Numeric-Value value="1000"/></Right-Side>"#
    ));
    assert!(out.contains(r#"<Numeric-Value value="50"/>"#));
}

#[test]
fn test_conditions_report_counts() {
    let mut doc = parse(TEMPLATE).unwrap();
    let config = PatchConfig::new()
        .with_entry(Section::Conditions, "NetProfit_IS", 1000)
        .with_entry(Section::Conditions, "NetProfit_OOS", 1000)
        .with_entry(Section::Conditions, "NoUnderscore", 1);

    let report = apply_patch(&mut doc, &config, &PatchOptions::default());

    let actions: Vec<_> = report.entries().iter().map(|e| e.action.clone()).collect();
    assert_eq!(
        actions,
        [
            PatchAction::ConditionsUpdated { count: 1 },
            PatchAction::NoMatchingCondition,
            PatchAction::MalformedKey,
        ]
    );
}

#[test]
fn test_applying_twice_is_idempotent() {
    let config = full_config();
    let options = PatchOptions::default();

    let mut once = parse(TEMPLATE).unwrap();
    apply_patch(&mut once, &config, &options);
    let first = once.to_xml_string();

    let mut twice = parse(&first).unwrap();
    let report = apply_patch(&mut twice, &config, &options);

    assert_eq!(twice.to_xml_string(), first);
    assert!(
        report
            .entries()
            .iter()
            .filter(|e| e.section != Section::Conditions)
            .all(|e| e.action == PatchAction::Unchanged)
    );
}

#[test]
fn test_empty_config_changes_nothing() {
    let mut doc = parse(TEMPLATE).unwrap();
    let report = apply_patch(&mut doc, &PatchConfig::new(), &PatchOptions::default());

    assert!(report.entries().is_empty());
    assert_eq!(doc.to_xml_string(), TEMPLATE);
    assert_eq!(unified_diff(TEMPLATE, &doc.to_xml_string(), "t.xml", "o.xml"), "");
}

#[test]
fn test_verify_fails_fast_on_tampered_output() {
    let mut doc = parse(TEMPLATE).unwrap();
    let config = full_config();
    apply_patch(&mut doc, &config, &PatchOptions::default());

    let tampered = doc
        .to_xml_string()
        .replace("<MaxGenerations>50</MaxGenerations>", "<MaxGenerations>51</MaxGenerations>")
        .replace("<MinSLInPips>5</MinSLInPips>", "<MinSLInPips>6</MinSLInPips>");
    let err = verify(&parse(&tampered).unwrap(), &config).unwrap_err();

    assert_eq!(
        err.to_string(),
        "Validation failed for build_mode.MaxGenerations: expected '50', got '51'"
    );
}

#[test]
fn test_diff_shows_only_patched_lines() {
    let mut doc = parse(TEMPLATE).unwrap();
    let config = PatchConfig::new().with_entry(Section::BuildMode, "PopulationSize", 200);
    apply_patch(&mut doc, &config, &PatchOptions::default());

    let diff = unified_diff(TEMPLATE, &doc.to_xml_string(), "template.xml", "patched.xml");

    let changed: Vec<_> = diff
        .lines()
        .filter(|l| {
            (l.starts_with('+') || l.starts_with('-'))
                && !l.starts_with("+++")
                && !l.starts_with("---")
        })
        .collect();
    assert_eq!(
        changed,
        [
            "-        <PopulationSize>100</PopulationSize>",
            "+        <PopulationSize>200</PopulationSize>",
        ]
    );
}

#[test]
fn test_symbol_with_underscore_over_bare_symbol() {
    let config = PatchConfig::new().with_entry(Section::DataSetup, "symbol", "US_500");
    let options = PatchOptions::default();

    let mut doc = parse("<Strategy><Symbol>EURUSD</Symbol></Strategy>").unwrap();
    apply_patch(&mut doc, &config, &options);
    let first = doc.to_xml_string();
    assert_eq!(first, "<Strategy><Symbol>US_500</Symbol></Strategy>");
    assert_eq!(verify(&doc, &config), Ok(()));

    let report = apply_patch(&mut doc, &config, &options);
    assert_eq!(doc.to_xml_string(), first);
    assert_eq!(
        report.entry(Section::DataSetup, "symbol").map(|e| e.action.clone()),
        Some(PatchAction::Unchanged)
    );
}

#[test]
fn test_symbol_with_underscore_keeps_template_timeframe() {
    let config = PatchConfig::new().with_entry(Section::DataSetup, "symbol", "US_500");
    let options = PatchOptions::default();

    let mut doc = parse("<Strategy><Symbol>EURUSD_H1</Symbol></Strategy>").unwrap();
    apply_patch(&mut doc, &config, &options);
    assert_eq!(text_at(&doc, ".//Symbol").as_deref(), Some("US_500_H1"));
    assert_eq!(verify(&doc, &config), Ok(()));

    apply_patch(&mut doc, &config, &options);
    assert_eq!(text_at(&doc, ".//Symbol").as_deref(), Some("US_500_H1"));
}
