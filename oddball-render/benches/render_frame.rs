use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use oddball_core::{Color, Stimulus};
use oddball_render::{load_font, SkiaRenderer};
use pprof::criterion::{Output, PProfProfiler};
use std::path::Path;

const WIDTH: u32 = 1920;
const HEIGHT: u32 = 1080;

fn renderer() -> SkiaRenderer {
    let font = load_font(Path::new("/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf")).ok();
    SkiaRenderer::new(WIDTH, HEIGHT, font).unwrap()
}

fn bench_stimuli(c: &mut Criterion) {
    let stimuli = [
        ("blank", Stimulus::blank(Color::GREY)),
        ("cross", Stimulus::cross(0.0)),
        ("cross_rotated", Stimulus::cross(45.0)),
        (
            "closing_message",
            Stimulus::message("The experiment is complete.\n\nThank you for your time!"),
        ),
    ];

    let mut group = c.benchmark_group("render_frame");
    for (name, stimulus) in &stimuli {
        let mut r = renderer();
        let mut fb = vec![0u8; (WIDTH * HEIGHT * 4) as usize];
        group.bench_function(*name, |b| {
            b.iter_batched(
                || stimulus.clone(),
                |s| {
                    let stats = r.render(black_box(&s), &mut fb).unwrap();
                    black_box(stats);
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

criterion_group! {
    name = benches;
    config = Criterion::default().with_profiler(PProfProfiler::new(100, Output::Flamegraph(None)));
    targets = bench_stimuli
}
criterion_main!(benches);
