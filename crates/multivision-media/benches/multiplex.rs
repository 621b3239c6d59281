//! Benchmarks for splitting multiplexed segment blobs.

use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use multivision_media::BlobLayout;

fn bench_split(c: &mut Criterion) {
    let mut group = c.benchmark_group("blob_split");

    for camera_count in [4u32, 16, 24] {
        // Typical 1s fMP4 fragment per camera at ~2 Mbit/s
        let per_camera = Bytes::from(vec![0u8; 256 * 1024]);
        let audio = Bytes::from(vec![0u8; 16 * 1024]);
        let layout = BlobLayout::new(camera_count, true);
        let cameras: Vec<Bytes> = (0..camera_count).map(|_| per_camera.clone()).collect();
        let blob = layout.encode(&cameras, Some(&audio)).unwrap();

        group.throughput(Throughput::Bytes(blob.len() as u64));
        group.bench_function(format!("split_{}_cameras", camera_count), |b| {
            b.iter(|| {
                let segment = layout.split(black_box(blob.clone())).unwrap();
                black_box(segment.into_parts().count())
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_split);
criterion_main!(benches);
