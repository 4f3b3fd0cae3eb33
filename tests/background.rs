use tellus::{BlockPos, BlockType, ChunkKey, ChunkState, Config, RecordingSink, Vec3, World};

fn config(chunk_size: u32, radius: i32, workers: usize) -> Config {
    let mut cfg = Config::default();
    cfg.world.chunk_size = chunk_size;
    cfg.world.radius = radius;
    cfg.streaming.background = true;
    cfg.streaming.workers = workers;
    cfg.save.autosave_ticks = 0;
    cfg
}

#[test]
fn background_matches_inline() {
    let mut bg = World::new(config(6, 1, 2)).unwrap();
    let mut inline_cfg = config(6, 1, 0);
    inline_cfg.streaming.background = false;
    let mut inline = World::new(inline_cfg).unwrap();

    let mut bg_sink = RecordingSink::new();
    let mut inline_sink = RecordingSink::new();
    let r = bg.tick(0.0, &mut bg_sink);
    assert_eq!(r.streaming.requested, 9);
    for k in ChunkKey::new(0, 0).square_around(1) {
        assert_ne!(bg.chunks().state(k), ChunkState::Unloaded);
    }
    bg.finish_streaming(&mut bg_sink);
    inline.tick(0.0, &mut inline_sink);

    assert_eq!(bg.chunks().resident_keys(), inline.chunks().resident_keys());
    assert_eq!(bg.chunks().block_count(), inline.chunks().block_count());
    assert_eq!(bg.chunks().pending_count(), 0);
    for (_, p, b) in inline_sink.iter() {
        assert_eq!(bg.chunks().block_at(p), Some(b));
    }
}

#[test]
fn loading_chunks_reject_edits() {
    let mut world = World::new(config(6, 0, 1)).unwrap();
    let mut sink = RecordingSink::new();
    world.tick(0.0, &mut sink);
    let pos = BlockPos::new(1, 50, 1);
    if world.chunks().state(ChunkKey::new(0, 0)) == ChunkState::Loading {
        assert!(world.place_block(pos, BlockType::Glass, &mut sink).is_err());
    }
    world.finish_streaming(&mut sink);
    assert!(world.place_block(pos, BlockType::Glass, &mut sink).is_ok());
}

#[test]
fn stale_results_are_discarded() {
    let mut world = World::new(config(4, 1, 2)).unwrap();
    let mut sink = RecordingSink::new();
    let first = world.tick(0.0, &mut sink);
    assert_eq!(first.streaming.requested, 9);

    // Leave before anything is collected; all nine old jobs are stale.
    world.observer_mut().position = Vec3::new(400.0, 0.0, 400.0);
    let second = world.tick(0.0, &mut sink);
    let finish = world.finish_streaming(&mut sink);

    assert_eq!(second.streaming.discarded + finish.discarded, 9);
    assert_eq!(second.streaming.loaded + finish.loaded, 9);
    let mut want: Vec<ChunkKey> = ChunkKey::new(100, 100).square_around(1).collect();
    want.sort();
    assert_eq!(world.chunks().resident_keys(), want);
    assert_eq!(sink.len(), world.chunks().block_count());
    assert!(sink.iter().all(|(_, p, _)| p.x >= 396 && p.z >= 396));
}
