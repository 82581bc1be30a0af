//! Flattening and state export.

use std::sync::mpsc;

use image::RgbaImage;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{EditorError, Result};
use crate::io::encode_png;
use crate::layers::LayerStore;
use crate::log_err;
use crate::surface::{CompositeOp, blend_pixel};

/// One element of the exported state. The sequence is always the flattened
/// composite, then the background, then every raster layer bottom to top.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StateEntry {
    Composite { data: Vec<u8> },
    Background { color: String },
    Raster { data: Vec<u8> },
}

/// Background fill with every raster layer composited on top in index order.
pub fn flatten(layers: &LayerStore) -> RgbaImage {
    let (w, h) = (layers.width(), layers.height());
    let mut out = RgbaImage::from_pixel(w, h, layers.background_color().to_rgba(1.0));
    let stride = w as usize * 4;

    for surface in layers.iter().filter_map(|l| l.surface()) {
        let src = surface.pixels();
        if src.dimensions() != (w, h) {
            continue;
        }
        let dst: &mut [u8] = &mut out;
        dst.par_chunks_mut(stride)
            .zip(src.as_raw().par_chunks(stride))
            .for_each(|(dst_row, src_row)| {
                for (d, s) in dst_row.chunks_exact_mut(4).zip(src_row.chunks_exact(4)) {
                    if s[3] == 0 {
                        continue;
                    }
                    let base = image::Rgba([d[0], d[1], d[2], d[3]]);
                    let top = image::Rgba([s[0], s[1], s[2], s[3]]);
                    d.copy_from_slice(&blend_pixel(base, top, CompositeOp::SourceOver, 1.0).0);
                }
            });
    }
    out
}

/// Collects results that finish in any order into their fixed positions.
#[derive(Debug)]
pub struct StateCollector<T> {
    slots: Vec<Option<T>>,
    remaining: usize,
}

impl<T> StateCollector<T> {
    pub fn new(len: usize) -> Self {
        Self { slots: (0..len).map(|_| None).collect(), remaining: len }
    }

    pub fn is_complete(&self) -> bool {
        self.remaining == 0
    }

    /// Store `value` at `slot`. Returns the full ordered sequence once the
    /// last empty slot is filled; resolving a slot twice keeps the later
    /// value without counting it again.
    pub fn resolve(&mut self, slot: usize, value: T) -> Option<Vec<T>> {
        let entry = self.slots.get_mut(slot)?;
        if entry.replace(value).is_none() {
            self.remaining -= 1;
        }
        if self.remaining > 0 {
            return None;
        }
        Some(self.slots.drain(..).flatten().collect())
    }
}

/// Build the exported state, encoding every image on the rayon pool.
pub fn collect_state(layers: &LayerStore) -> Result<Vec<StateEntry>> {
    let composite = flatten(layers);
    let rasters: Vec<&RgbaImage> = layers.iter().filter_map(|l| l.surface()).map(|s| s.pixels()).collect();

    let mut collector = StateCollector::new(rasters.len() + 2);
    let background = StateEntry::Background { color: layers.background_color().to_hex() };
    let mut done = collector.resolve(1, background);

    let (tx, rx) = mpsc::channel::<(usize, Result<Vec<u8>>)>();
    rayon::scope(|s| {
        let composite = &composite;
        let tx0 = tx.clone();
        s.spawn(move |_| {
            // The receiver outlives the scope.
            tx0.send((0, encode_png(composite))).ok();
        });
        for (i, img) in rasters.iter().enumerate() {
            let tx = tx.clone();
            s.spawn(move |_| {
                tx.send((i + 2, encode_png(img))).ok();
            });
        }
    });
    drop(tx);

    let mut first_err = None;
    for (slot, encoded) in rx {
        match encoded {
            Ok(data) => {
                let entry = if slot == 0 { StateEntry::Composite { data } } else { StateEntry::Raster { data } };
                if let Some(all) = collector.resolve(slot, entry) {
                    done = Some(all);
                }
            }
            Err(e) => {
                if first_err.is_none() {
                    first_err = Some(e);
                }
            }
        }
    }

    if let Some(e) = first_err {
        log_err!("State export failed: {}", e);
        return Err(e);
    }
    done.ok_or_else(|| EditorError::Encode("state export incomplete".into()))
}

/// Export the state and hand it to `callback` once every entry is ready.
pub fn get_state<F>(layers: &LayerStore, callback: F)
where
    F: FnOnce(Result<Vec<StateEntry>>),
{
    callback(collect_state(layers));
}
