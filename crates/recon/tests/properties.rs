// Property-based tests for extraction, substitution, matching and buckets.
// CI: 256 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release

use std::collections::HashSet;

use proptest::prelude::*;
use scm_recon::categorize::{categorize, classify};
use scm_recon::compare::{compare, join_key, CompareOptions};
use scm_recon::layout::ItemLayout;
use scm_recon::placeholder::render;
use scm_recon::{
    BenchmarkRegistry, ClientControls, ComplianceItem, ComplianceScanResult, ControlSet,
    MatchedRecord, RawValue, Table, Warnings,
};

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

fn config_256() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(256),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

/// Client cell: a few names in varied spacing, sometimes blank.
fn arb_client() -> impl Strategy<Value = String> {
    prop_oneof![
        3 => prop::sample::select(vec!["Acme", "Globex", "Initech", "Umbrella"])
            .prop_map(str::to_string),
        1 => prop::sample::select(vec!["  Acme ", "Globex  "]).prop_map(str::to_string),
        1 => prop::sample::select(vec!["", "   "]).prop_map(str::to_string),
    ]
}

/// Ids drawn from a small pool so joins actually collide, with casing and
/// whitespace noise.
fn arb_id() -> impl Strategy<Value = String> {
    (0u32..12, any::<bool>(), any::<bool>()).prop_map(|(n, lower, pad)| {
        let id = format!("RHEL-08-0100{n:02}");
        let id = if lower { id.to_lowercase() } else { id };
        if pad {
            format!(" {id} ")
        } else {
            id
        }
    })
}

fn arb_status() -> impl Strategy<Value = String> {
    prop::sample::select(vec![
        "Approved",
        "Not Approved",
        "Pending Review",
        "Risk Accepted",
        "Draft",
        "",
    ])
    .prop_map(str::to_string)
}

fn arb_item() -> impl Strategy<Value = ComplianceItem> {
    (arb_id(), arb_status(), any::<bool>()).prop_map(|(id, status, should_fix)| ComplianceItem {
        compliance_id: id,
        benchmark_name: "RHEL 8.X".into(),
        deviation_status: status,
        should_fix,
        ..Default::default()
    })
}

fn arb_finding() -> impl Strategy<Value = ComplianceScanResult> {
    arb_id().prop_map(|id| ComplianceScanResult {
        compliance_id: id,
        benchmark_name: "RHEL 8.X".into(),
        ..Default::default()
    })
}

fn placeholder_name() -> impl Strategy<Value = String> {
    r"[A-Z][A-Z_]{0,10}[A-Z]"
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]

    #[test]
    fn one_control_entry_per_client(
        rows in prop::collection::vec((arb_client(), r"[a-z]{0,6}"), 0..20),
    ) {
        let mut table = Table::new("Compensating Controls", vec!["CLIENT".into(), "REGION".into()]);
        for (client, region) in &rows {
            table.push_values(vec![RawValue::from(client.as_str()), RawValue::from(region.as_str())]);
        }

        let controls = ClientControls::extract(&table, "CLIENT").unwrap();
        let expected: HashSet<&str> = rows
            .iter()
            .map(|(c, _)| c.trim())
            .filter(|c| !c.is_empty())
            .collect();

        prop_assert_eq!(controls.len(), expected.len());
        for client in expected {
            prop_assert!(controls.get(client).is_some(), "missing client {}", client);
        }
    }

    #[test]
    fn resolvable_token_never_survives(
        name in placeholder_name(),
        value in r"[a-zA-Z0-9 ]{0,12}",
        before in r"[a-z .]{0,20}",
        after in r"[a-z .]{0,20}",
    ) {
        let bindings: ControlSet = [(name.as_str(), value.as_str())].into_iter().collect();
        let token = format!("{{{{{name}}}}}");
        let template = format!("{before}{token}{after}");

        let rendered = render(&template, &bindings);
        prop_assert!(!rendered.text.contains(&token), "token survived: {}", rendered.text);
        prop_assert!(rendered.unresolved.is_empty());
        prop_assert_eq!(rendered.text, format!("{before}{value}{after}"));
    }

    #[test]
    fn findings_partition_exactly(
        items in prop::collection::vec(arb_item(), 0..15),
        findings in prop::collection::vec(arb_finding(), 0..25),
        include_unmatched_items in any::<bool>(),
    ) {
        let options = CompareOptions { include_unmatched_items };
        let result = compare("RHEL 8.X", &items, &findings, &options, &mut Warnings::new());

        prop_assert_eq!(result.matched.len() + result.unmatched_findings.len(), findings.len());

        let matched: HashSet<String> = result
            .matched
            .iter()
            .map(|m| join_key(&m.finding.compliance_id))
            .collect();
        for f in &result.unmatched_findings {
            prop_assert!(!matched.contains(&join_key(&f.compliance_id)));
        }
        for m in &result.matched {
            prop_assert_eq!(join_key(&m.item.compliance_id), join_key(&m.finding.compliance_id));
        }
        for i in &result.unmatched_items {
            prop_assert!(!matched.contains(&join_key(&i.compliance_id)));
        }
    }

    #[test]
    fn categorization_is_total(items in prop::collection::vec(arb_item(), 0..30)) {
        let matched: Vec<MatchedRecord> = items
            .into_iter()
            .map(|item| MatchedRecord { item, finding: ComplianceScanResult::default() })
            .collect();

        let buckets = categorize(&matched);
        let total: usize = buckets.values().map(Vec::len).sum();
        prop_assert_eq!(total, matched.len());

        for (disposition, records) in &buckets {
            for r in records {
                prop_assert_eq!(classify(&r.item), *disposition);
            }
        }
    }

    #[test]
    fn extraction_is_idempotent(
        id in arb_id(),
        rationale in r"[a-zA-Z ]{0,10}(\{\{[A-Z_]{1,8}\}\})?[a-z ]{0,10}",
        status in arb_status(),
        fix in prop::sample::select(vec!["yes", "no", "", "x"]),
    ) {
        let mut table = Table::new(
            "SCM: RHEL 8.X",
            vec![
                "Compliance ID".into(),
                "Deviation Rationale".into(),
                "Deviation Rationale Status".into(),
                "Should Fix".into(),
            ],
        );
        table.push_values(vec![
            id.as_str().into(),
            rationale.as_str().into(),
            status.as_str().into(),
            fix.into(),
        ]);
        let layout = ItemLayout::resolve(&table).unwrap();
        let registry = BenchmarkRegistry::builtin();
        let controls: ControlSet = [("CLOUD_PROVIDER", "AWS")].into_iter().collect();
        let row = &table.rows[0];

        let strategy = registry.dispatch_item(row, &layout);
        prop_assert!(strategy.is_some());
        let strategy = strategy.unwrap();
        prop_assert_eq!(
            strategy.extract(row, &layout, &controls),
            strategy.extract(row, &layout, &controls)
        );
    }
}
