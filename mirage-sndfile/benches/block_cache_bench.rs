//! Block Cache Performance Benchmark
//!
//! Measures sector-sized reads through the filter:
//! - 44100 Hz source: decode only
//! - 48000 Hz / 22050 Hz sources: decode plus block resampling
//!
//! Each iteration reads one second of virtual PCM (75 sectors of 2352
//! bytes) from a block that is not cached, so every iteration pays for
//! one block fill.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use hound::{SampleFormat, WavSpec, WavWriter};
use mirage_common::{MemoryStream, SimplifiedStream};
use mirage_sndfile::{ResamplerQuality, SndfileFilterStream, SndfileOptions};
use std::io::{Cursor, Read, Seek, SeekFrom};

const SECTOR: usize = 2352;
const SECONDS: u64 = 4;

/// Stereo sine WAV of `SECONDS` seconds
fn sine_wav(sample_rate: u32) -> Vec<u8> {
    let spec = WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, spec).unwrap();
        for frame in 0..sample_rate as u64 * SECONDS {
            let t = frame as f32 / sample_rate as f32;
            let sample = ((2.0 * std::f32::consts::PI * 440.0 * t).sin() * 16000.0) as i16;
            writer.write_sample(sample).unwrap();
            writer.write_sample(sample).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

fn open(data: &[u8], quality: ResamplerQuality) -> SimplifiedStream<SndfileFilterStream> {
    let stream = MemoryStream::new(data.to_vec()).with_filename("bench.wav");
    let options = SndfileOptions {
        resampler_quality: quality,
    };
    let filter = SndfileFilterStream::open_with_options(Box::new(stream), false, &options).unwrap();
    SimplifiedStream::new(filter)
}

fn bench_block_fill(c: &mut Criterion) {
    let mut group = c.benchmark_group("block_fill");
    group.throughput(Throughput::Bytes(75 * SECTOR as u64));

    for &rate in &[44100u32, 48000, 22050] {
        let data = sine_wav(rate);
        let mut stream = open(&data, ResamplerQuality::Linear);
        let mut sector = vec![0u8; SECTOR];
        let mut block = 0u64;

        group.bench_with_input(BenchmarkId::new("sectors", rate), &rate, |b, _| {
            b.iter(|| {
                // Alternate blocks so the cache never hits
                block = (block + 1) % SECONDS;
                stream.seek(SeekFrom::Start(block * 75 * SECTOR as u64)).unwrap();
                for _ in 0..75 {
                    stream.read_exact(&mut sector).unwrap();
                }
                black_box(&sector);
            });
        });
    }

    group.finish();
}

fn bench_quality(c: &mut Criterion) {
    let mut group = c.benchmark_group("resampler_quality");
    let data = sine_wav(48000);

    for quality in [
        ResamplerQuality::Nearest,
        ResamplerQuality::Linear,
        ResamplerQuality::Cubic,
        ResamplerQuality::Septic,
    ] {
        let mut stream = open(&data, quality);
        let mut buffer = vec![0u8; 75 * SECTOR];
        let mut block = 0u64;

        group.bench_with_input(
            BenchmarkId::new("block", format!("{:?}", quality)),
            &quality,
            |b, _| {
                b.iter(|| {
                    block = (block + 1) % SECONDS;
                    stream.seek(SeekFrom::Start(block * buffer.len() as u64)).unwrap();
                    stream.read_exact(&mut buffer).unwrap();
                    black_box(&buffer);
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_block_fill, bench_quality);
criterion_main!(benches);
