use proptest::prelude::*;
use tellus_blocks::BlockType;

fn any_block() -> impl Strategy<Value = BlockType> {
    (0..BlockType::ALL.len()).prop_map(|i| BlockType::ALL[i])
}

proptest! {
    // name() and from_name() agree for every variant
    #[test]
    fn name_lookup_roundtrip(b in any_block()) {
        prop_assert_eq!(BlockType::from_name(b.name()), Some(b));
        prop_assert_eq!(b.name().parse::<BlockType>().ok(), Some(b));
    }

    // serde uses the same name as the save format
    #[test]
    fn serde_name_matches(b in any_block()) {
        let json = serde_json::to_string(&b).unwrap();
        prop_assert_eq!(json, format!("\"{}\"", b.name()));
    }

    // arbitrary strings that are not a known name never parse
    #[test]
    fn unknown_names_rejected(s in "[a-z_]{1,12}") {
        prop_assume!(BlockType::ALL.iter().all(|b| b.name() != s));
        prop_assert!(s.parse::<BlockType>().is_err());
    }
}

#[test]
fn inventory_order_matches_hotbar() {
    let names: Vec<&str> = BlockType::INVENTORY
        .iter()
        .map(|b| b.display_name())
        .collect();
    assert_eq!(
        names,
        ["Grass", "Gravel", "Stone", "Stone Bricks", "Log", "Wood", "Glass"]
    );
    assert!(!BlockType::Leaves.is_placeable());
    assert_eq!(BlockType::StoneBricks.texture_path(), "textures/stone_bricks.png");
}
