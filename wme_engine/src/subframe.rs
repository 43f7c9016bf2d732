use std::rc::Rc;

use anyhow::Result;
use wme_formats::{Rect, Rgba, SubframeDef};
use wme_persist::{Persist, PersistError, PersistMgr};

use crate::error::ScriptError;
use crate::game::Game;
use crate::handle_list::SubframeHandle;
use crate::render::{ActiveRect, Blit, BlitMode, DrawParams, OwnerId};
use crate::script::{find_member, MethodCall, ScValue, Scriptable, ScriptableBase};
use crate::surface::{ColorKey, Surface};

/// One drawable element of a live frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Subframe {
    pub base: ScriptableBase,
    surface: Option<Rc<Surface>>,
    surface_filename: Option<String>,
    ck_default: bool,
    ck_rgb: Rgba,
    life_time: i32,
    keep_loaded: bool,
    pub rect: Rect,
    pub hotspot_x: i32,
    pub hotspot_y: i32,
    pub alpha: Rgba,
    pub transparent: Rgba,
    pub two_d_only: bool,
    pub three_d_only: bool,
    pub mirror_x: bool,
    pub mirror_y: bool,
    pub decoration: bool,
    pub editor_selected: bool,
}

impl Default for Subframe {
    fn default() -> Self {
        Self {
            base: ScriptableBase::default(),
            surface: None,
            surface_filename: None,
            ck_default: true,
            ck_rgb: Rgba::new(0, 0, 0, 255),
            life_time: -1,
            keep_loaded: false,
            rect: Rect::EMPTY,
            hotspot_x: 0,
            hotspot_y: 0,
            alpha: Rgba::WHITE,
            transparent: Rgba::MAGENTA,
            two_d_only: false,
            three_d_only: false,
            mirror_x: false,
            mirror_y: false,
            decoration: false,
            editor_selected: false,
        }
    }
}

impl Subframe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a subframe, loading its image when the definition names one.
    pub fn from_def(game: &mut Game, def: &SubframeDef) -> Result<Self> {
        let mut sub = Subframe {
            base: ScriptableBase::with_editor_props(def.editor_props.clone()),
            hotspot_x: def.hotspot_x,
            hotspot_y: def.hotspot_y,
            alpha: def.alpha,
            two_d_only: def.two_d_only,
            three_d_only: def.three_d_only,
            mirror_x: def.mirror_x,
            mirror_y: def.mirror_y,
            decoration: def.decoration,
            editor_selected: def.editor_selected,
            ..Subframe::default()
        };
        if let Some(image) = &def.image {
            let color_key = def.transparent.map_or(ColorKey::Default, ColorKey::Custom);
            sub.set_surface(game, image, color_key)?;
        }
        if let Some(key) = def.transparent {
            sub.transparent = key;
        }
        match def.rect {
            Some(rect) => sub.rect = rect,
            None => sub.set_default_rect(),
        }
        Ok(sub)
    }

    pub fn to_def(&self) -> SubframeDef {
        SubframeDef {
            image: self.surface_filename.clone(),
            transparent: (self.transparent != Rgba::MAGENTA).then_some(self.transparent),
            rect: (self.rect != self.surface_bounds()).then_some(self.rect),
            hotspot_x: self.hotspot_x,
            hotspot_y: self.hotspot_y,
            alpha: self.alpha,
            two_d_only: self.two_d_only,
            three_d_only: self.three_d_only,
            mirror_x: self.mirror_x,
            mirror_y: self.mirror_y,
            decoration: self.decoration,
            editor_selected: self.editor_selected,
            editor_props: self.base.editor_props.clone(),
        }
    }

    pub fn surface(&self) -> Option<&Surface> {
        self.surface.as_deref()
    }

    pub fn image(&self) -> Option<&str> {
        self.surface.as_ref()?;
        self.surface_filename.as_deref()
    }

    /// Replaces the surface with `filename`. The rect is left alone. On
    /// failure the subframe is left without an image.
    pub fn set_surface(&mut self, game: &mut Game, filename: &str, color_key: ColorKey) -> Result<()> {
        self.clear_surface(game);
        let surface = game
            .surfaces
            .add_surface(filename, color_key, self.life_time, self.keep_loaded)?;
        self.surface = Some(surface);
        self.surface_filename = Some(filename.to_string());
        match color_key {
            ColorKey::Default => self.ck_default = true,
            ColorKey::Custom(key) => {
                self.ck_default = false;
                self.ck_rgb = key;
            }
        }
        Ok(())
    }

    fn color_key(&self) -> ColorKey {
        if self.ck_default {
            ColorKey::Default
        } else {
            ColorKey::Custom(self.ck_rgb)
        }
    }

    fn surface_bounds(&self) -> Rect {
        self.surface.as_ref().map_or(Rect::EMPTY, |surface| surface.bounds())
    }

    pub fn set_default_rect(&mut self) {
        self.rect = self.surface_bounds();
    }

    /// Hands the surface back to the storage.
    pub fn release(&mut self, game: &mut Game) {
        if let Some(surface) = self.surface.take() {
            game.surfaces.remove_surface(&surface);
        }
    }

    /// Clears the image entirely, as scripts do with `SetImage(null)`.
    pub fn clear_surface(&mut self, game: &mut Game) {
        self.release(game);
        self.surface_filename = None;
    }

    /// Re-acquires the surface named in a loaded save state.
    pub fn restore(&mut self, game: &mut Game) -> Result<()> {
        if let Some(filename) = self.surface_filename.clone() {
            let surface =
                game.surfaces
                    .add_surface(&filename, self.color_key(), self.life_time, self.keep_loaded)?;
            self.surface = Some(surface);
        }
        Ok(())
    }

    /// Screen rectangle covered at `(x, y)` with the given scale in percent.
    pub fn bounding_rect(&self, x: i32, y: i32, scale_x: f32, scale_y: f32) -> Rect {
        let ratio_x = scale_x / 100.0;
        let ratio_y = scale_y / 100.0;
        let left = x as f32 - self.hotspot_x as f32 * ratio_x;
        let top = y as f32 - self.hotspot_y as f32 * ratio_y;
        Rect::new(
            left as i32,
            top as i32,
            (left + self.rect.width() as f32 * ratio_x) as i32,
            (top + self.rect.height() as f32 * ratio_y) as i32,
        )
    }

    pub fn draw(
        &self,
        game: &mut Game,
        handle: SubframeHandle,
        x: i32,
        y: i32,
        owner: Option<OwnerId>,
        params: &DrawParams,
    ) -> Result<()> {
        let Some(surface) = self.surface.as_deref() else {
            return Ok(());
        };
        let ratio_x = params.zoom_x / 100.0;
        let ratio_y = params.zoom_y / 100.0;
        let unscaled = params.zoom_x == 100.0 && params.zoom_y == 100.0;

        if let Some(owner) = owner.filter(|_| !self.decoration) {
            let (rx, ry, rw, rh) = if unscaled {
                (
                    x - self.hotspot_x + self.rect.left,
                    y - self.hotspot_y + self.rect.top,
                    self.rect.width(),
                    self.rect.height(),
                )
            } else {
                (
                    (x as f32 - (self.hotspot_x + self.rect.left) as f32 * ratio_x) as i32,
                    (y as f32 - (self.hotspot_y + self.rect.top) as f32 * ratio_y) as i32,
                    (self.rect.width() as f32 * ratio_x) as i32,
                    (self.rect.height() as f32 * ratio_y) as i32,
                )
            };
            game.renderer.register_active_rect(ActiveRect {
                owner,
                subframe: handle,
                x: rx,
                y: ry,
                width: rw,
                height: rh,
                zoom_x: params.zoom_x,
                zoom_y: params.zoom_y,
                precise: params.precise,
            });
        }

        if game.suspended_rendering {
            return Ok(());
        }

        let alpha = if self.alpha != Rgba::WHITE {
            self.alpha
        } else {
            params.alpha
        };
        let scaled_x = (x as f32 - self.hotspot_x as f32 * ratio_x) as i32;
        let scaled_y = (y as f32 - self.hotspot_y as f32 * ratio_y) as i32;
        let (bx, by, mode) = if params.rotate != 0.0 {
            (
                scaled_x,
                scaled_y,
                BlitMode::Transform {
                    rotate: params.rotate,
                    zoom_x: params.zoom_x,
                    zoom_y: params.zoom_y,
                    hotspot_x: self.hotspot_x,
                    hotspot_y: self.hotspot_y,
                },
            )
        } else if unscaled {
            (x - self.hotspot_x, y - self.hotspot_y, BlitMode::Plain)
        } else {
            (
                scaled_x,
                scaled_y,
                BlitMode::Zoom {
                    zoom_x: params.zoom_x,
                    zoom_y: params.zoom_y,
                },
            )
        };

        game.renderer.blit(&Blit {
            surface,
            x: bx,
            y: by,
            rect: self.rect,
            mode,
            alpha,
            blend: params.blend,
            mirror_x: self.mirror_x,
            mirror_y: self.mirror_y,
        })
    }

    fn sc_get_image(&mut self, call: &mut MethodCall<'_>) -> ScValue {
        call.args.correct(0);
        ScValue::from(self.image())
    }

    fn sc_set_image(&mut self, call: &mut MethodCall<'_>) -> ScValue {
        call.args.correct(1);
        let value = call.args.pop();
        if value.is_null() {
            self.clear_surface(call.game);
            return ScValue::Bool(true);
        }
        let filename = value.to_text();
        match self.set_surface(call.game, &filename, ColorKey::Default) {
            Ok(()) => {
                self.set_default_rect();
                ScValue::Bool(true)
            }
            Err(err) => {
                log::warn!("SetImage('{filename}') failed: {err:#}");
                ScValue::Bool(false)
            }
        }
    }
}

type Getter = fn(&Subframe) -> ScValue;
type Setter = fn(&mut Subframe, &ScValue);
type Method = fn(&mut Subframe, &mut MethodCall<'_>) -> ScValue;

const PROPERTIES: &[(&str, Getter)] = &[
    ("Type", |_| ScValue::from("subframe")),
    ("AlphaColor", |sub| ScValue::Int(sub.alpha.0 as i32)),
    ("TransparentColor", |sub| ScValue::Int(sub.transparent.0 as i32)),
    ("Is2DOnly", |sub| ScValue::Bool(sub.two_d_only)),
    ("Is3DOnly", |sub| ScValue::Bool(sub.three_d_only)),
    ("MirrorX", |sub| ScValue::Bool(sub.mirror_x)),
    ("MirrorY", |sub| ScValue::Bool(sub.mirror_y)),
    ("Decoration", |sub| ScValue::Bool(sub.decoration)),
    ("HotspotX", |sub| ScValue::Int(sub.hotspot_x)),
    ("HotspotY", |sub| ScValue::Int(sub.hotspot_y)),
];

const SETTERS: &[(&str, Setter)] = &[
    ("AlphaColor", |sub, value| sub.alpha = Rgba(value.to_int() as u32)),
    ("Is2DOnly", |sub, value| sub.two_d_only = value.to_bool()),
    ("Is3DOnly", |sub, value| sub.three_d_only = value.to_bool()),
    ("MirrorX", |sub, value| sub.mirror_x = value.to_bool()),
    ("MirrorY", |sub, value| sub.mirror_y = value.to_bool()),
    ("Decoration", |sub, value| sub.decoration = value.to_bool()),
    ("HotspotX", |sub, value| sub.hotspot_x = value.to_int()),
    ("HotspotY", |sub, value| sub.hotspot_y = value.to_int()),
];

const METHODS: &[(&str, Method)] = &[
    ("GetImage", Subframe::sc_get_image),
    ("SetImage", Subframe::sc_set_image),
];

impl Subframe {
    pub fn has_method(name: &str) -> bool {
        find_member(METHODS, name).is_some()
    }

    pub fn has_property(&self, name: &str) -> bool {
        find_member(PROPERTIES, name).is_some() || self.base.has_property(name)
    }
}

impl Scriptable for Subframe {
    fn get_property(&self, name: &str) -> ScValue {
        match find_member(PROPERTIES, name) {
            Some(getter) => getter(self),
            None => self.base.get_property(name),
        }
    }

    fn set_property(&mut self, name: &str, value: ScValue) {
        match find_member(SETTERS, name) {
            Some(setter) => setter(self, &value),
            None => self.base.set_property(name, value),
        }
    }

    fn call_method(
        &mut self,
        name: &str,
        call: &mut MethodCall<'_>,
    ) -> Result<ScValue, ScriptError> {
        match find_member(METHODS, name) {
            Some(method) => Ok(method(self, call)),
            None => self.base.call_method(name, call),
        }
    }

    fn to_script_string(&self) -> String {
        "[subframe]".to_string()
    }
}

impl Persist for Subframe {
    fn persist(&mut self, mgr: &mut PersistMgr) -> Result<(), PersistError> {
        self.base.persist(mgr)?;
        mgr.transfer("2d_only", &mut self.two_d_only)?;
        mgr.transfer("3d_only", &mut self.three_d_only)?;
        mgr.transfer("alpha", &mut self.alpha.0)?;
        mgr.transfer("decoration", &mut self.decoration)?;
        mgr.transfer("editor_selected", &mut self.editor_selected)?;
        mgr.transfer("hotspot_x", &mut self.hotspot_x)?;
        mgr.transfer("hotspot_y", &mut self.hotspot_y)?;
        mgr.transfer("rect.left", &mut self.rect.left)?;
        mgr.transfer("rect.top", &mut self.rect.top)?;
        mgr.transfer("rect.right", &mut self.rect.right)?;
        mgr.transfer("rect.bottom", &mut self.rect.bottom)?;
        mgr.transfer("surface_filename", &mut self.surface_filename)?;
        mgr.transfer("ck_default", &mut self.ck_default)?;
        mgr.transfer("ck_rgb", &mut self.ck_rgb.0)?;
        mgr.transfer("life_time", &mut self.life_time)?;
        mgr.transfer("keep_loaded", &mut self.keep_loaded)?;
        mgr.transfer("mirror_x", &mut self.mirror_x)?;
        mgr.transfer("mirror_y", &mut self.mirror_y)?;
        mgr.transfer("transparent", &mut self.transparent.0)?;
        if !mgr.is_saving() {
            self.surface = None;
        }
        Ok(())
    }
}
