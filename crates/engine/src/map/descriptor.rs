use serde::Deserialize;

use super::MapLoadError;

/// A tiled-style JSON map. Only the fields the world uses are read; unknown
/// fields are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct MapDescriptor {
    pub width: u32,
    pub height: u32,
    #[serde(rename = "tilewidth")]
    pub tile_width: u32,
    #[serde(rename = "tileheight")]
    pub tile_height: u32,
    #[serde(default)]
    pub tilesets: Vec<TilesetDescriptor>,
    pub layers: Vec<LayerDescriptor>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TilesetDescriptor {
    #[serde(rename = "firstgid")]
    pub first_gid: u32,
    #[serde(default)]
    pub name: String,
    /// Path of an external tileset file; its tiles are empty until resolved.
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub tiles: Vec<TileDescriptor>,
    #[serde(default, rename = "tileoffset")]
    pub tile_offset: Option<TileOffset>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct TileOffset {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TileDescriptor {
    pub id: u32,
    #[serde(default)]
    pub image: Option<String>,
    /// Terrain name.
    #[serde(default, rename = "type", alias = "class")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LayerDescriptor {
    TileLayer(TileLayerDescriptor),
    ObjectGroup(ObjectGroupDescriptor),
    /// Image layers, groups and anything newer.
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TileLayerDescriptor {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub x: i32,
    #[serde(default)]
    pub y: i32,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default, rename = "startx")]
    pub start_x: i32,
    #[serde(default, rename = "starty")]
    pub start_y: i32,
    #[serde(default, rename = "offsetx")]
    pub offset_x: f32,
    #[serde(default, rename = "offsety")]
    pub offset_y: f32,
    /// Inline layers carry one grid of gids; infinite maps use `chunks`.
    #[serde(default)]
    pub data: Option<Vec<u32>>,
    #[serde(default)]
    pub chunks: Vec<ChunkDescriptor>,
}

impl TileLayerDescriptor {
    /// The layer's chunks, treating an inline layer as a single chunk.
    pub fn chunk_views(&self) -> Vec<ChunkView<'_>> {
        match &self.data {
            Some(data) => vec![ChunkView {
                x: self.x,
                y: self.y,
                width: self.width,
                height: self.height,
                data,
            }],
            None => self
                .chunks
                .iter()
                .map(|chunk| ChunkView {
                    x: chunk.x,
                    y: chunk.y,
                    width: chunk.width,
                    height: chunk.height,
                    data: &chunk.data,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChunkDescriptor {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub data: Vec<u32>,
}

#[derive(Debug, Clone, Copy)]
pub struct ChunkView<'a> {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub data: &'a [u32],
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObjectGroupDescriptor {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub objects: Vec<ObjectDescriptor>,
}

/// A placed object. Positions and sizes are in map pixels.
#[derive(Debug, Clone, Deserialize)]
pub struct ObjectDescriptor {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type", alias = "class")]
    pub kind: String,
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub width: f32,
    #[serde(default)]
    pub height: f32,
    #[serde(default)]
    pub properties: Vec<PropertyDescriptor>,
}

impl ObjectDescriptor {
    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties
            .iter()
            .find(|property| property.name == name)
            .map(|property| &property.value)
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        match self.property(name) {
            Some(PropertyValue::Number(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        match self.property(name) {
            Some(PropertyValue::Text(value)) => Some(value),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PropertyDescriptor {
    pub name: String,
    pub value: PropertyValue,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl MapDescriptor {
    /// Parses map JSON. Errors name the JSON path that failed.
    pub fn from_json_str(raw: &str) -> Result<Self, MapLoadError> {
        parse_json(raw)
    }

    pub fn tile_layers(&self) -> impl Iterator<Item = &TileLayerDescriptor> + '_ {
        self.layers.iter().filter_map(|layer| match layer {
            LayerDescriptor::TileLayer(layer) => Some(layer),
            _ => None,
        })
    }

    pub fn objects(&self) -> impl Iterator<Item = &ObjectDescriptor> + '_ {
        self.layers
            .iter()
            .filter_map(|layer| match layer {
                LayerDescriptor::ObjectGroup(group) => Some(group.objects.iter()),
                _ => None,
            })
            .flatten()
    }
}

impl TilesetDescriptor {
    pub fn from_json_str(raw: &str) -> Result<Self, MapLoadError> {
        #[derive(Deserialize)]
        struct ExternalTileset {
            #[serde(default)]
            name: String,
            #[serde(default)]
            tiles: Vec<TileDescriptor>,
            #[serde(default, rename = "tileoffset")]
            tile_offset: Option<TileOffset>,
        }

        let external: ExternalTileset = parse_json(raw)?;
        Ok(Self {
            first_gid: 0,
            name: external.name,
            source: None,
            tiles: external.tiles,
            tile_offset: external.tile_offset,
        })
    }
}

fn parse_json<T: serde::de::DeserializeOwned>(raw: &str) -> Result<T, MapLoadError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    serde_path_to_error::deserialize(&mut deserializer).map_err(|error| {
        let path = error.path().to_string();
        MapLoadError::Parse {
            path,
            source: error.into_inner(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_layers_objects_and_properties() {
        let map = MapDescriptor::from_json_str(
            r#"{
                "width": 4, "height": 4, "tilewidth": 64, "tileheight": 32,
                "orientation": "isometric",
                "tilesets": [{"firstgid": 1, "tiles": [{"id": 0, "type": "grass"}]}],
                "layers": [
                    {"type": "tilelayer", "name": "ground", "width": 2, "height": 1, "data": [1, 0]},
                    {"type": "imagelayer", "name": "sky"},
                    {"type": "objectgroup", "objects": [
                        {"id": 3, "type": "RespawnPoint", "x": 32, "y": 64,
                         "properties": [{"name": "direction", "type": "float", "value": 90}]}
                    ]}
                ]
            }"#,
        )
        .expect("map");

        assert_eq!(map.tile_width, 64);
        assert_eq!(map.tile_layers().count(), 1);
        assert!(matches!(map.layers[1], LayerDescriptor::Other));
        let views = map.tile_layers().next().expect("layer").chunk_views();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].data, &[1, 0]);

        let objects: Vec<_> = map.objects().collect();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].kind, "RespawnPoint");
        assert_eq!(objects[0].number("direction"), Some(90.0));
        assert_eq!(objects[0].text("direction"), None);
    }

    #[test]
    fn parse_errors_name_the_failing_path() {
        let error = MapDescriptor::from_json_str(
            r#"{"width": 4, "height": 4, "tilewidth": 64, "tileheight": "tall", "layers": []}"#,
        )
        .expect_err("bad tile height");
        match error {
            MapLoadError::Parse { path, .. } => assert_eq!(path, "tileheight"),
            other => panic!("unexpected error {other:?}"),
        }
    }
}
