//! Decoded fonts and images
//!
//! Images live on the co-processor's storage and are read over the link on
//! demand; fonts are built in. The resource cache decides what stays decoded,
//! this module only holds whatever it has not released yet.

use alloc::collections::BTreeMap;
use alloc::rc::Rc;
use core::cell::RefCell;
use core::fmt::Write;

use defmt::{trace, warn};
use embedded_graphics::mono_font::MonoFont;
use profont::{PROFONT_10_POINT, PROFONT_12_POINT, PROFONT_14_POINT, PROFONT_9_POINT};

use marquee_core::cache::{AssetId, LoadError, ResourceKind, ResourceSource};
use marquee_core::traits::{Decoded, ResourceDecoder};
use marquee_protocol::{decode_bmp, Bitmap, BmpError, LinkFailure};

use crate::link::{CoprocessorLink, LinkError};

/// Asset reads are local to the co-processor, so they get a short deadline
const ASSET_TIMEOUT_MS: u16 = 3_000;

/// Built-in face for a configured font name
pub fn builtin_font(name: &str) -> Option<&'static MonoFont<'static>> {
    match name {
        "bmilk" => Some(&PROFONT_14_POINT),
        "comic8" | "coolv" | "handv" => Some(&PROFONT_12_POINT),
        "lemon" => Some(&PROFONT_9_POINT),
        "showcard" => Some(&PROFONT_10_POINT),
        _ => None,
    }
}

/// A decoded asset
pub enum Asset {
    Font(&'static MonoFont<'static>),
    Image(Bitmap),
}

/// Decoded assets by id
#[derive(Default)]
pub struct AssetStore {
    assets: BTreeMap<u32, Asset>,
    next_id: u32,
}

impl AssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, asset: Asset) -> AssetId {
        self.next_id = self.next_id.wrapping_add(1);
        self.assets.insert(self.next_id, asset);
        AssetId(self.next_id)
    }

    pub fn font(&self, id: AssetId) -> Option<&'static MonoFont<'static>> {
        match self.assets.get(&id.0) {
            Some(Asset::Font(font)) => Some(*font),
            _ => None,
        }
    }

    pub fn image(&self, id: AssetId) -> Option<&Bitmap> {
        match self.assets.get(&id.0) {
            Some(Asset::Image(image)) => Some(image),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }
}

/// Resource decoder backed by built-in fonts and the co-processor's storage
pub struct LinkDecoder {
    link: Rc<RefCell<CoprocessorLink>>,
    store: Rc<RefCell<AssetStore>>,
    panel_width: u16,
}

impl LinkDecoder {
    pub fn new(link: Rc<RefCell<CoprocessorLink>>, store: Rc<RefCell<AssetStore>>, panel_width: u16) -> Self {
        Self {
            link,
            store,
            panel_width,
        }
    }

    /// Storage path: backgrounds are per panel width, icons are shared
    fn path(&self, kind: ResourceKind, name: &str) -> heapless::String<64> {
        let mut path = heapless::String::new();
        // Names are bounded well below the path capacity
        let _ = match kind {
            ResourceKind::Background => write!(path, "images/{}/{}.bmp", self.panel_width, name),
            _ => write!(path, "images/{}.bmp", name),
        };
        path
    }

    fn decode_font(&mut self, source: &ResourceSource) -> Result<Decoded, LoadError> {
        let ResourceSource::Named(name) = source else {
            return Err(LoadError::Decode);
        };
        let font = builtin_font(name.as_str()).ok_or(LoadError::NotFound)?;
        let asset = self.store.borrow_mut().insert(Asset::Font(font));
        Ok(Decoded {
            asset,
            width: (font.character_size.width + font.character_spacing) as u16,
            height: font.character_size.height as u16,
        })
    }

    fn decode_image(&mut self, kind: ResourceKind, source: &ResourceSource) -> Result<Decoded, LoadError> {
        let image = match source {
            ResourceSource::Inline(bitmap) => decode_bmp(bitmap.bytes()),
            ResourceSource::Named(name) => {
                let path = self.path(kind, name);
                let bytes = self
                    .link
                    .borrow_mut()
                    .read_asset(&path, ASSET_TIMEOUT_MS)
                    .map_err(|e| match e {
                        LinkError::Failure(LinkFailure::NotFound) => LoadError::NotFound,
                        e => {
                            warn!("Reading {} failed: {:?}", path.as_str(), e);
                            LoadError::Decode
                        }
                    })?;
                decode_bmp(&bytes)
            }
        }
        .map_err(|e| match e {
            BmpError::BadSize => LoadError::OutOfMemory,
            _ => LoadError::Decode,
        })?;

        let (width, height) = (image.width, image.height);
        let asset = self.store.borrow_mut().insert(Asset::Image(image));
        Ok(Decoded { asset, width, height })
    }
}

impl ResourceDecoder for LinkDecoder {
    fn decode(&mut self, kind: ResourceKind, source: &ResourceSource) -> Result<Decoded, LoadError> {
        match kind {
            ResourceKind::Font => self.decode_font(source),
            ResourceKind::Icon | ResourceKind::Background => self.decode_image(kind, source),
        }
    }

    fn release(&mut self, asset: AssetId) {
        self.store.borrow_mut().assets.remove(&asset.0);
        trace!("Released asset {}, {} held", asset.0, self.store.borrow().len());
    }
}
