use criterion::{
    black_box, criterion_group, criterion_main, AxisScale, BenchmarkId, Criterion,
    PlotConfiguration,
};
use ndarray::Array2;
use ndarray_rand::rand::SeedableRng;
use ndarray_rand::rand_distr::StandardNormal;
use ndarray_rand::RandomExt;
use rand_xoshiro::Xoshiro256Plus;
use ufl::traits::Fit;
use ufl_clustering::{BatchKMeans, BatchWindow};

fn batch_k_means_bench(c: &mut Criterion) {
    let mut rng = Xoshiro256Plus::seed_from_u64(40);
    // (n_patches, n_centroids) for 6x6 RGB patches
    let sizes = vec![(1_000, 50), (10_000, 100), (10_000, 400)];
    let n_features = 108;

    let mut benchmark = c.benchmark_group("batch_k_means");
    benchmark.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));
    for (n_patches, n_centroids) in sizes {
        let patches: Array2<f64> =
            Array2::random_using((n_patches, n_features), StandardNormal, &mut rng);
        let id = format!("{}x{}", n_patches, n_centroids);
        benchmark.bench_function(BenchmarkId::new("full_pass", id), |bencher| {
            bencher.iter(|| {
                BatchKMeans::params_with_rng(black_box(n_centroids), rng.clone())
                    .n_iterations(black_box(10))
                    .batch_window(BatchWindow::FullPass)
                    .fit(&patches)
                    .unwrap()
            });
        });
    }

    benchmark.finish();
}

criterion_group! {
    name = benches;
    config = Criterion::default().sample_size(10);
    targets = batch_k_means_bench
}
criterion_main!(benches);
