use skd_config::load_layered_yaml_from_strings;

#[test]
fn scenario_config_hash_stable_across_layer_split() {
    // One merged doc vs the same content split over two layers must hash
    // identically: the hash covers the effective config, not the files.
    let merged = "rpc_url: http://node\nlimits:\n  min_epoch_credits: 700\n";
    let base = "rpc_url: http://node\n";
    let over = "limits:\n  min_epoch_credits: 700\n";

    let one = load_layered_yaml_from_strings(&[merged]).unwrap();
    let two = load_layered_yaml_from_strings(&[base, over]).unwrap();

    assert_eq!(one.config_hash, two.config_hash);
    assert_eq!(one.canonical_json, two.canonical_json);
}

#[test]
fn scenario_config_hash_changes_with_content() {
    let a = load_layered_yaml_from_strings(&["rpc_url: http://a\n"]).unwrap();
    let b = load_layered_yaml_from_strings(&["rpc_url: http://b\n"]).unwrap();
    assert_ne!(a.config_hash, b.config_hash);
}
