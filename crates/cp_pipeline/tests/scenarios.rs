//! End-to-end scenarios through `run_from_bytes`: wire JSON in, response and
//! run record out.

use std::time::{Duration, Instant};

use assert_json_diff::assert_json_eq;
use cp_io::hasher;
use cp_io::loader::{self, LoadLimits};
use cp_pipeline::{
    engine_identifiers, load, optimize, run_from_bytes, run_from_path, PipelineError, PipelineOutputs,
};
use rand_chacha::ChaCha20Rng;
use rand_core::{RngCore, SeedableRng};
use serde_json::{json, Value};

const TS: &str = "2025-08-12T10:00:00Z";

fn request(ratios: &[i64], needs: &[(&str, i64)], supply: &[(&str, i64)]) -> Vec<u8> {
    let ratios: Vec<Value> = ratios.iter().map(|q| json!({ "qty": q })).collect();
    // serde_json::Value sorts object keys, so the maps are written by hand to keep request order.
    format!(
        r#"{{"casePacks":[{{"packs":1,"sizeRatios":{}}}],"needPerStore":{},"warehouseAvailableQty":{}}}"#,
        Value::Array(ratios),
        ordered_object(needs),
        ordered_object(supply)
    )
    .into_bytes()
}

fn ordered_object(xs: &[(&str, i64)]) -> String {
    let body: Vec<String> = xs.iter().map(|(k, v)| format!("{}:{v}", json!(k))).collect();
    format!("{{{}}}", body.join(","))
}

fn run(bytes: &[u8]) -> Result<PipelineOutputs, PipelineError> {
    run_from_bytes(bytes, LoadLimits::default(), engine_identifiers(), TS)
}

fn stores(out: &PipelineOutputs) -> Vec<(String, u64)> {
    out.response.stores.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

fn pairs(xs: &[(&str, u64)]) -> Vec<(String, u64)> {
    xs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

fn sum_stores(out: &PipelineOutputs) -> u64 {
    out.response.stores.values().sum()
}

fn sum_warehouses(out: &PipelineOutputs) -> u64 {
    out.response.warehouses.values().sum()
}

fn check_conservation(out: &PipelineOutputs, supply: &[(&str, i64)]) {
    let available: u64 = supply.iter().map(|(_, s)| (*s).max(0) as u64).sum();
    assert!(sum_stores(out) <= available);
    assert_eq!(sum_stores(out), sum_warehouses(out));
    assert_eq!(out.response.remaining_supply, available - sum_stores(out));
    for ((_, got), (_, cap)) in out.response.warehouses.iter().zip(supply) {
        assert!(*got <= (*cap).max(0) as u64);
    }
}

/// Seeded fleet fixtures: `n` ids with values in `lo..lo + span`.
fn fleet(prefix: &str, n: usize, lo: i64, span: u64, rng: &mut ChaCha20Rng) -> Vec<(String, i64)> {
    (0..n).map(|i| (format!("{prefix}{i}"), lo + (rng.next_u64() % span) as i64)).collect()
}

fn as_refs(xs: &[(String, i64)]) -> Vec<(&str, i64)> {
    xs.iter().map(|(k, v)| (k.as_str(), *v)).collect()
}

#[test]
fn exact_fit_uses_every_casepack() {
    let supply = [("wh1", 15), ("wh2", 10), ("wh3", 12), ("wh4", 6)];
    let out = run(&request(
        &[1, 4, 10],
        &[("str1", 100), ("str2", 150), ("str3", 200), ("str4", 250)],
        &supply,
    ))
    .unwrap();
    assert_eq!(sum_stores(&out), 43);
    assert_eq!(out.response.remaining_supply, 0);
    assert_eq!(sum_warehouses(&out), 43);
    check_conservation(&out, &supply);
    assert_eq!(out.run_record.summary.supply_mode, "constrained");
    assert_eq!(out.run_record.summary.distribution_mode, "drain_all");
    assert_eq!(out.run_record.summary.total_need, "700");
}

#[test]
fn optimize_computes_the_exact_fit_outcome() {
    let bytes = request(
        &[1, 4, 10],
        &[("str1", 100), ("str2", 150), ("str3", 200), ("str4", 250)],
        &[("wh1", 15), ("wh2", 10), ("wh3", 12), ("wh4", 6)],
    );
    let loaded = loader::load_request_bytes(&bytes, LoadLimits::default()).unwrap();
    let req = load::to_domain(&loaded.doc).unwrap();
    let out = optimize(&req).unwrap();

    assert_eq!(out.totals.items_per_casepack, 15);
    assert_eq!(out.totals.total_need, 700);
    assert_eq!(out.totals.available_casepacks, 43);
    assert_eq!(out.stores.allocated, 43);
    assert_eq!(out.stores.allocation.values().copied().collect::<Vec<_>>(), vec![6, 9, 12, 16]);
    assert_eq!(out.warehouses.distribution.values().copied().collect::<Vec<_>>(), vec![15, 10, 12, 6]);
    assert_eq!(out.remaining_supply, 0);
    assert_eq!(out, run(&bytes).unwrap().outcome);
}

#[test]
fn run_id_hashes_the_record_without_its_id() {
    let out = run(&request(&[5], &[("a", 25), ("b", 50)], &[("w", 20)])).unwrap();
    let mut body = serde_json::to_value(&out.run_record).unwrap();
    let id = body.as_object_mut().unwrap().remove("id").unwrap();
    assert_eq!(id, Value::String(hasher::run_id_from_canonical(TS, &body).unwrap()));
}

#[test]
fn surplus_satisfies_every_need() {
    let supply = [("warehouse1", 100), ("warehouse2", 50)];
    let out = run(&request(&[5], &[("store1", 25), ("store2", 50), ("store3", 75)], &supply)).unwrap();
    assert_eq!(
        stores(&out),
        pairs(&[("store1", 5), ("store2", 10), ("store3", 15)])
    );
    assert_eq!(out.response.remaining_supply, 120);
    check_conservation(&out, &supply);
}

#[test]
fn exact_match_has_no_leftover() {
    let supply = [("w1", 30), ("w2", 30)];
    let out = run(&request(&[10], &[("store1", 100), ("store2", 200), ("store3", 300)], &supply)).unwrap();
    assert_eq!(
        stores(&out),
        pairs(&[("store1", 10), ("store2", 20), ("store3", 30)])
    );
    assert_eq!(out.response.remaining_supply, 0);
    assert_json_eq!(serde_json::to_value(&out.response.warehouses).unwrap(), json!({"w1": 30, "w2": 30}));
}

#[test]
fn scarce_supply_favours_larger_needs() {
    let supply = [("warehouse1", 5), ("warehouse2", 5)];
    let out = run(&request(&[100], &[("store1", 1000), ("store2", 2000), ("store3", 3000)], &supply)).unwrap();
    assert_eq!(
        stores(&out),
        pairs(&[("store1", 2), ("store2", 3), ("store3", 5)])
    );
    check_conservation(&out, &supply);
}

#[test]
fn zero_need_stores_get_nothing() {
    let supply = [("wh1", 20), ("wh2", 15)];
    let out = run(&request(
        &[1, 4],
        &[("store1", 50), ("store2", 0), ("store3", 100), ("store4", 0)],
        &supply,
    ))
    .unwrap();
    let got = stores(&out);
    assert_eq!(got[1], ("store2".into(), 0));
    assert_eq!(got[3], ("store4".into(), 0));
    assert!(got[0].1 > 0 && got[2].1 > 0);
    check_conservation(&out, &supply);
    assert_eq!(out.report.warnings().count(), 2);
    assert_eq!(out.run_record.summary.validation_warnings, 2);
}

#[test]
fn no_demand_leaves_all_supply() {
    let supply = [("warehouse1", 50)];
    let out = run(&request(&[1, 2, 3], &[], &supply)).unwrap();
    assert!(out.response.stores.is_empty());
    assert_eq!(out.response.remaining_supply, 50);
    assert_eq!(sum_warehouses(&out), 0);
    assert_eq!(out.run_record.summary.supply_mode, "no_demand");
}

#[test]
fn surplus_with_mixed_ratios() {
    let supply = [("wh1", 50), ("wh2", 50)];
    let out = run(&request(&[1, 2, 3], &[("store1", 10), ("store2", 20), ("store3", 30)], &supply)).unwrap();
    // ceil(10/6), ceil(20/6), ceil(30/6)
    assert_eq!(
        stores(&out),
        pairs(&[("store1", 2), ("store2", 4), ("store3", 5)])
    );
    assert!(sum_stores(&out) * 6 >= 60);
    assert_eq!(out.response.remaining_supply, 89);
    check_conservation(&out, &supply);
}

#[test]
fn various_ratio_shapes_conserve_supply() {
    let twenty: Vec<i64> = (1..=20).collect();
    let shapes: [&[i64]; 5] = [&[5], &[2, 3, 4, 5], &[1, 2, 3], &[1, 4, 10], twenty.as_slice()];
    let supply = [("warehouse1", 50), ("warehouse2", 40)];
    for ratios in shapes {
        let out = run(&request(ratios, &[("store1", 100), ("store2", 200), ("store3", 300)], &supply)).unwrap();
        assert!(sum_stores(&out) <= 90);
        check_conservation(&out, &supply);
    }
}

#[test]
fn single_warehouse_supplies_everything() {
    let supply = [("onlyWarehouse", 30)];
    let out = run(&request(&[1, 4, 10], &[("store1", 100), ("store2", 150)], &supply)).unwrap();
    assert_eq!(out.response.warehouses.values().copied().collect::<Vec<_>>(), vec![sum_stores(&out)]);
}

#[test]
fn negative_supply_is_clamped_and_flagged() {
    let supply = [("a", -5), ("b", 10)];
    let out = run(&request(&[2], &[("s", 8)], &supply)).unwrap();
    assert_json_eq!(serde_json::to_value(&out.response.warehouses).unwrap(), json!({"a": 0, "b": 4}));
    assert_eq!(out.response.remaining_supply, 6);
    assert_eq!(out.report.issues[0].code, "Supply.Negative");
}

#[test]
fn seeded_fleets_are_reproducible() {
    let a = fleet("store", 50, 50, 500, &mut ChaCha20Rng::seed_from_u64(42));
    let b = fleet("store", 50, 50, 500, &mut ChaCha20Rng::seed_from_u64(42));
    assert_eq!(a, b);
    assert!(a.iter().all(|(_, v)| (50..550).contains(v)));
    assert_ne!(a, fleet("store", 50, 50, 500, &mut ChaCha20Rng::seed_from_u64(43)));
}

#[test]
fn seeded_fleet_of_fifty_stores() {
    let mut rng = ChaCha20Rng::seed_from_u64(42);
    let needs = fleet("store", 50, 50, 500, &mut rng);
    let supply = fleet("warehouse", 10, 10, 100, &mut rng);
    let supply_refs = as_refs(&supply);
    let out = run(&request(&[1, 3, 6, 12], &as_refs(&needs), &supply_refs)).unwrap();
    assert_eq!(out.response.stores.len(), 50);
    assert_eq!(out.response.warehouses.len(), 10);
    check_conservation(&out, &supply_refs);
}

#[test]
fn twenty_stores_five_warehouses_all_present() {
    let needs: Vec<(String, i64)> = (1..=20).map(|i| (format!("store{i}"), i * 50)).collect();
    let supply: Vec<(String, i64)> = (1..=5).map(|i| (format!("warehouse{i}"), i * 100)).collect();
    let out = run(&request(&[1, 3, 5, 7], &as_refs(&needs), &as_refs(&supply))).unwrap();
    assert_eq!(out.response.stores.len(), 20);
    assert_eq!(out.response.warehouses.len(), 5);
    check_conservation(&out, &as_refs(&supply));
}

#[test]
fn thousand_stores_hundred_warehouses_is_fast() {
    let mut rng = ChaCha20Rng::seed_from_u64(7);
    let needs = fleet("store", 1000, 100, 900, &mut rng);
    let supply = fleet("wh", 100, 50, 450, &mut rng);
    let bytes = request(&[1, 5, 10, 25], &as_refs(&needs), &as_refs(&supply));

    let start = Instant::now();
    let out = run(&bytes).unwrap();
    assert!(start.elapsed() < Duration::from_secs(1), "took {:?}", start.elapsed());
    assert_eq!(out.response.stores.len(), 1000);
    check_conservation(&out, &as_refs(&supply));
}

#[test]
fn other_fleet_shapes_conserve_supply() {
    let mut rng = ChaCha20Rng::seed_from_u64(2024);
    let twenty: Vec<i64> = (1..=20).collect();
    let cases: [(usize, usize, &[i64]); 3] = [(100, 20, &[2, 3, 5, 7, 11]), (200, 30, twenty.as_slice()), (500, 50, &[1, 2, 4])];
    for (s, w, ratios) in cases {
        let needs = fleet("s", s, 1, 1000, &mut rng);
        let supply = fleet("w", w, 0, 200, &mut rng);
        let out = run(&request(ratios, &as_refs(&needs), &as_refs(&supply))).unwrap();
        check_conservation(&out, &as_refs(&supply));
    }
}

#[test]
fn identical_requests_give_identical_artifacts() {
    let bytes = request(&[1, 4, 10], &[("b", 70), ("a", 70), ("c", 10)], &[("w2", 3), ("w1", 3)]);
    let a = run(&bytes).unwrap();
    let b = run(&bytes).unwrap();
    assert_eq!(a.response, b.response);
    assert_eq!(a.result, b.result);
    assert_eq!(a.run_record, b.run_record);
    assert!(a.run_record.id.starts_with("RUN:2025-08-12T10:00:00Z-"));
    assert_eq!(a.run_record.outputs.result_id, a.result.id);

    // Same request with keys reordered: same allocation per id, same digest.
    let reordered = request(&[1, 4, 10], &[("c", 10), ("a", 70), ("b", 70)], &[("w1", 3), ("w2", 3)]);
    let c = run(&reordered).unwrap();
    assert_eq!(c.result, a.result);
    assert_eq!(c.run_record.inputs.request_sha256, a.run_record.inputs.request_sha256);
}

#[test]
fn output_keeps_request_key_order() {
    let out = run(&request(&[5], &[("zeta", 10), ("alpha", 10), ("mid", 10)], &[("w9", 10), ("w1", 10)])).unwrap();
    let text = serde_json::to_string(&out.response).unwrap();
    let z = text.find("zeta").unwrap();
    let a = text.find("alpha").unwrap();
    let m = text.find("mid").unwrap();
    assert!(z < a && a < m);
    assert!(text.find("w9").unwrap() < text.find("w1").unwrap());
}

#[test]
fn extra_bundles_are_echoed_but_ignored() {
    let bytes = br#"{
        "casePacks": [ {"packs": 1, "sizeRatios": [{"qty": 5}]}, {"packs": 9, "sizeRatios": [{"qty": 1}]} ],
        "needPerStore": {"s1": 10},
        "warehouseAvailableQty": {"w1": 4}
    }"#;
    let out = run(bytes).unwrap();
    assert_eq!(out.response.case_packs.len(), 2);
    assert_eq!(out.response.case_packs[1].packs, 9);
    assert_eq!(stores(&out), pairs(&[("s1", 2)]));
    assert_eq!(out.run_record.summary.ignored_bundles, 1);
    assert_eq!(out.report.issues[0].code, "Bundle.ExtraIgnored");
}

#[test]
fn invalid_requests_map_to_error_classes() {
    let empty_bundle = br#"{"casePacks":[{"sizeRatios":[]}],"needPerStore":{"a":1},"warehouseAvailableQty":{"w":1}}"#;
    assert!(matches!(run(empty_bundle), Err(PipelineError::InvalidConfiguration(_))));

    let zero_sum = br#"{"casePacks":[{"sizeRatios":[{"qty":0}]}],"needPerStore":{"a":1},"warehouseAvailableQty":{"w":1}}"#;
    assert!(matches!(run(zero_sum), Err(PipelineError::InvalidConfiguration(_))));

    let no_needs = br#"{"casePacks":[{"sizeRatios":[{"qty":1}]}],"warehouseAvailableQty":{"w":1}}"#;
    match run(no_needs) {
        Err(PipelineError::InvalidInput(r)) => assert_eq!(r.issues[0].code, "Needs.Missing"),
        other => panic!("unexpected {other:?}"),
    }

    assert!(matches!(run(b"not json"), Err(PipelineError::Io(_))));
    assert!(matches!(
        run_from_bytes(b"{}", LoadLimits { max_bytes: 1 }, engine_identifiers(), TS),
        Err(PipelineError::Io(_))
    ));
    let ok = request(&[1], &[("a", 1)], &[("w", 1)]);
    assert!(matches!(
        run_from_bytes(&ok, LoadLimits::default(), engine_identifiers(), "whenever"),
        Err(PipelineError::Build(_))
    ));
}

#[test]
fn run_from_path_reads_local_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("request.json");
    std::fs::write(&path, request(&[5], &[("s", 25)], &[("w", 10)])).unwrap();
    let out = run_from_path(&path, LoadLimits::default(), engine_identifiers(), TS).unwrap();
    assert_eq!(stores(&out), pairs(&[("s", 5)]));
    assert_eq!(out.response.remaining_supply, 5);
}
