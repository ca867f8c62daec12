//! Criterion benchmarks for the Tickwork reference host.
//!
//! Two benchmark groups:
//! - `powered_row`: 500 generator/machine pairs -- energy push and draw
//! - `unload_field`: 500 unloaders each draining its own hold -- cargo transfer

use criterion::{Criterion, criterion_group, criterion_main};
use tickwork_core::adjacency::{BlockPos, Direction};
use tickwork_core::engine::Engine;
use tickwork_core::item::ItemStack;
use tickwork_core::test_utils::*;

// ===========================================================================
// Builders
// ===========================================================================

/// 500 unloaders spaced 3 blocks apart, each above a hold of 8 full stacks.
fn build_unload_field() -> Engine {
    let mut engine = Engine::new();
    let stacks: Vec<ItemStack> = (0..8)
        .map(|i| ItemStack::new(if i % 2 == 0 { iron_ore() } else { coal() }, 64))
        .collect();

    for i in 0..500 {
        let pos = BlockPos::new((i % 25) * 3, 1, (i / 25) * 3);
        engine
            .add_cargo_hold(pos.offset(Direction::Down), hold_with(8, &stacks))
            .expect("free position");
        engine.add_unloader(pos, unloader()).expect("free position");
    }
    engine
}

// ===========================================================================
// Benchmarks
// ===========================================================================

fn bench_powered_row(c: &mut Criterion) {
    let (mut engine, _) = powered_row(500);
    engine.advance(10);

    c.bench_function("powered_row_step", |b| {
        b.iter(|| {
            engine.step();
            engine.drain_events();
        });
    });
}

fn bench_unload_field(c: &mut Criterion) {
    let mut group = c.benchmark_group("unload_field");

    group.bench_function("step", |b| {
        b.iter_batched(
            build_unload_field,
            |mut engine| {
                engine.advance(5);
                engine
            },
            criterion::BatchSize::LargeInput,
        );
    });

    group.finish();
}

criterion_group!(benches, bench_powered_row, bench_unload_field);
criterion_main!(benches);
