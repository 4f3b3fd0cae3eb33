use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tellus_blocks::BlockType;
use tellus_chunk::build_chunk;
use tellus_edit::EditRecord;
use tellus_geom::BlockPos;
use tellus_runtime::{GenJob, Runtime};
use tellus_world::{ChunkKey, Terrain, TerrainConfig};

fn collect(rt: &Runtime, n: usize) -> Vec<tellus_runtime::GenOut> {
    let mut out = Vec::new();
    while out.len() < n {
        match rt.wait_result(Duration::from_secs(10)) {
            Some(r) => out.push(r),
            None => panic!("timed out with {} of {n} results", out.len()),
        }
    }
    out
}

#[test]
fn workers_match_inline_generation() {
    let terrain = Arc::new(Terrain::new(8, TerrainConfig::default()));
    let rt = Runtime::new(terrain.clone(), 2).unwrap();
    assert_eq!(rt.workers, 2);

    let keys: Vec<ChunkKey> = ChunkKey::new(0, 0).square_around(1).collect();
    for (i, k) in keys.iter().enumerate() {
        rt.submit(GenJob {
            key: *k,
            job_id: i as u64 + 1,
            edits: Vec::new(),
        });
    }
    let results = collect(&rt, keys.len());
    let ids: HashSet<u64> = results.iter().map(|r| r.job_id).collect();
    assert_eq!(ids.len(), keys.len());
    for r in &results {
        let inline = build_chunk(&terrain, r.key, &[]);
        assert_eq!(r.built.sorted(), inline.sorted());
    }
}

#[test]
fn job_edits_are_applied() {
    let terrain = Arc::new(Terrain::new(4, TerrainConfig::default()));
    let rt = Runtime::new(terrain.clone(), 1).unwrap();
    let p = BlockPos::new(1, terrain.height_at(1, 1) + 1, 1);
    rt.submit(GenJob {
        key: ChunkKey::new(0, 0),
        job_id: 7,
        edits: vec![EditRecord::placed(p, BlockType::Glass)],
    });
    let out = collect(&rt, 1).remove(0);
    assert_eq!(out.job_id, 7);
    assert_eq!(out.built.blocks.get(&p), Some(&BlockType::Glass));
    assert!(rt.drain_worker_results().is_empty());
}
