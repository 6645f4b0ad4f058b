//! CIFAR-10 binary batches
//!
//! A batch file (`data_batch_1.bin` to `data_batch_5.bin`, `test_batch.bin`) is a plain
//! sequence of records of 3073 bytes: one label byte in `0..10` followed by the 32x32 red
//! plane, the green plane and the blue plane, each stored row-major. Images are returned in the
//! interleaved `(height, width, channels)` layout used by [`ImageSet`], with pixel values in
//! `[0, 255]`.
use std::fs;
use std::io::Read;
use std::path::Path;

use flate2::read::GzDecoder;
use ndarray::{Array1, Array2};
use tracing::info;
use ufl::{Float, ImageDim, ImageSet};

use crate::error::{DatasetError, Result};

pub const HEIGHT: usize = 32;
pub const WIDTH: usize = 32;
pub const CHANNELS: usize = 3;
pub const N_CLASSES: u8 = 10;

const PLANE_LEN: usize = HEIGHT * WIDTH;
const RECORD_LEN: usize = 1 + CHANNELS * PLANE_LEN;

/// Shape of a CIFAR-10 image
pub fn dim() -> ImageDim {
    ImageDim::new(HEIGHT, WIDTH, CHANNELS)
}

/// Images of one or more batch files with their class labels
#[derive(Clone, Debug, PartialEq)]
pub struct Cifar10Batch<F> {
    images: ImageSet<F>,
    labels: Array1<u8>,
}

impl<F: Float> Cifar10Batch<F> {
    pub fn images(&self) -> &ImageSet<F> {
        &self.images
    }

    /// Class of every image, in `0..10`
    pub fn labels(&self) -> &Array1<u8> {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn into_parts(self) -> (ImageSet<F>, Array1<u8>) {
        (self.images, self.labels)
    }
}

/// Decodes the records of an in-memory batch
pub fn parse_batch<F: Float>(bytes: &[u8]) -> Result<Cifar10Batch<F>> {
    if bytes.len() % RECORD_LEN != 0 {
        return Err(DatasetError::Truncated {
            len: bytes.len(),
            record_len: RECORD_LEN,
        });
    }

    let n_images = bytes.len() / RECORD_LEN;
    let mut records = Array2::zeros((n_images, CHANNELS * PLANE_LEN));
    let mut labels = Array1::zeros(n_images);

    for (idx, (record, mut image)) in bytes
        .chunks_exact(RECORD_LEN)
        .zip(records.outer_iter_mut())
        .enumerate()
    {
        let label = record[0];
        if label >= N_CLASSES {
            return Err(DatasetError::InvalidLabel { record: idx, label });
        }
        labels[idx] = label;

        // planar [channel][pixel] to interleaved [pixel][channel]
        for (channel, plane) in record[1..].chunks_exact(PLANE_LEN).enumerate() {
            for (pixel, &value) in plane.iter().enumerate() {
                image[pixel * CHANNELS + channel] = F::cast(value);
            }
        }
    }

    Ok(Cifar10Batch {
        images: ImageSet::new(records, dim())?,
        labels,
    })
}

/// Reads and decodes a batch file, transparently decompressing `.gz` files
pub fn load_batch<F: Float, P: AsRef<Path>>(path: P) -> Result<Cifar10Batch<F>> {
    let bytes = read_batch(path.as_ref())?;
    parse_batch(&bytes)
}

/// Reads several batch files, e.g. the five training batches, into a single set
pub fn load_batches<F: Float, P: AsRef<Path>>(paths: &[P]) -> Result<Cifar10Batch<F>> {
    let mut bytes = Vec::new();
    for path in paths {
        bytes.extend(read_batch(path.as_ref())?);
    }
    parse_batch(&bytes)
}

fn read_batch(path: &Path) -> Result<Vec<u8>> {
    let raw = fs::read(path)?;
    let bytes = if path.extension().map_or(false, |ext| ext == "gz") {
        let mut decoded = Vec::new();
        GzDecoder::new(&raw[..]).read_to_end(&mut decoded)?;
        decoded
    } else {
        raw
    };
    info!(
        path = %path.display(),
        n_images = bytes.len() / RECORD_LEN,
        "read cifar-10 batch"
    );
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    /// A record whose pixel `(y, x)` of channel `c` is `(y + x + 50 * c) % 256`
    fn record(label: u8) -> Vec<u8> {
        let mut record = vec![label];
        for channel in 0..CHANNELS {
            for y in 0..HEIGHT {
                for x in 0..WIDTH {
                    record.push(((y + x + 50 * channel) % 256) as u8);
                }
            }
        }
        record
    }

    #[test]
    fn planes_are_interleaved() {
        let mut bytes = record(3);
        bytes.extend(record(9));

        let batch = parse_batch::<f32>(&bytes).unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.labels(), &Array1::from(vec![3, 9]));

        let image = batch.images().image(1).unwrap();
        assert_eq!(image.dim(), (32, 32, 3));
        assert_eq!(image[[0, 0, 0]], 0.);
        assert_eq!(image[[2, 5, 0]], 7.);
        assert_eq!(image[[2, 5, 1]], 57.);
        assert_eq!(image[[31, 31, 2]], 162.);
    }

    #[test]
    fn empty_buffer_is_an_empty_batch() {
        let batch = parse_batch::<f64>(&[]).unwrap();
        assert!(batch.is_empty());
        assert_eq!(batch.images().dim(), dim());
    }

    #[test]
    fn truncated_buffer_is_rejected() {
        let bytes = record(1);
        let res = parse_batch::<f64>(&bytes[..100]);
        assert!(matches!(
            res,
            Err(DatasetError::Truncated {
                len: 100,
                record_len: 3073
            })
        ));
    }

    #[test]
    fn labels_are_checked() {
        let mut bytes = record(0);
        bytes.extend(record(10));
        let res = parse_batch::<f64>(&bytes);
        assert!(matches!(
            res,
            Err(DatasetError::InvalidLabel {
                record: 1,
                label: 10
            })
        ));
    }

    #[test]
    fn batches_are_loaded_from_disk() {
        let dir = std::env::temp_dir().join(format!("ufl-cifar10-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();

        let plain = dir.join("data_batch_1.bin");
        fs::write(&plain, record(4)).unwrap();

        let gzipped = dir.join("data_batch_2.bin.gz");
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        let mut bytes = record(5);
        bytes.extend(record(6));
        encoder.write_all(&bytes).unwrap();
        fs::write(&gzipped, encoder.finish().unwrap()).unwrap();

        let batch = load_batch::<f64, _>(&gzipped).unwrap();
        assert_eq!(batch.labels(), &Array1::from(vec![5, 6]));

        let batch = load_batches::<f64, _>(&[&plain, &gzipped]).unwrap();
        assert_eq!(batch.labels(), &Array1::from(vec![4, 5, 6]));
        assert_eq!(batch.images().nimages(), 3);

        assert!(matches!(
            load_batch::<f64, _>(dir.join("missing.bin")),
            Err(DatasetError::Io(_))
        ));
        fs::remove_dir_all(&dir).unwrap();
    }
}
