//! Benchmarks for the compile and render hot paths.
//!
//! Run with: cargo bench --bench engine_bench -p ms-engine

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use ms_engine::{compile_tone, Mixer, MixerHost, PlayerConfig, Session};
use ms_formats::{decode_note, record_count, NoteStreamWriter};
use ms_ir::{Adsr, Articulation, Instrument, Song, ToneSpec, VolumeOverride, Waveform};
use std::hint::black_box;
use std::sync::Arc;

fn dense_stream(notes: u32) -> Vec<u8> {
    let mut writer = NoteStreamWriter::new(2048);
    for i in 0..notes {
        writer.push_note(i * 16, 12, 48 + (i % 24) as u8, (i % 2) as u8).unwrap();
    }
    writer.finish()
}

fn bench_decode(c: &mut Criterion) {
    let data = dense_stream(4096);
    c.bench_function("decode_stream", |b| {
        b.iter(|| {
            for i in 0..record_count(&data) {
                black_box(decode_note(black_box(&data), i).unwrap());
            }
        });
    });
}

fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile_tone");
    let tone = ToneSpec::steady(Waveform::Sawtooth, 220.0);
    let adsr = Adsr::new(10, 600, 90, 300);

    for (name, articulation) in [
        ("linear", Articulation::new(false, false)),
        ("non_linear", Articulation::new(true, true)),
    ] {
        group.bench_with_input(BenchmarkId::from_parameter(name), &articulation, |b, &art| {
            b.iter(|| black_box(compile_tone(&tone, &adsr, art, black_box(1500.0), 200)));
        });
    }
    group.finish();
}

fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("render_frames");
    let song = Arc::new(
        Song::new("bench", "", 10, dense_stream(512))
            .with_channel(Instrument::saw_bass(), VolumeOverride::UseDefault)
            .with_channel(Instrument::bright_acoustic_piano(), VolumeOverride::UseDefault),
    );

    for frames in [4410usize, 44100] {
        group.bench_with_input(BenchmarkId::from_parameter(frames), &frames, |b, &frames| {
            b.iter(|| {
                let mut mixer = Mixer::new(44100);
                let mut session = Session::new(PlayerConfig::default());
                session.start(song.clone(), None, 0.0, &mut MixerHost::new(&mut mixer, 255)).unwrap();
                for _ in 0..frames {
                    black_box(mixer.render_frame());
                }
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_decode, bench_compile, bench_render);
criterion_main!(benches);
