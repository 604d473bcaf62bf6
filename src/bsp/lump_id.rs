use std::fmt;

macro_rules! lump_ids {
    ($($variant:ident = $index:literal => $name:literal,)*) => {
        /// Directory slot identifiers
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(u8)]
        pub enum LumpId {
            $($variant = $index,)*
        }

        impl LumpId {
            /// Every slot in directory order
            pub const ALL: [LumpId; crate::bsp::HEADER_LUMPS] = [$(LumpId::$variant,)*];

            pub fn from_index(index: usize) -> Option<Self> {
                match index {
                    $($index => Some(LumpId::$variant),)*
                    _ => None,
                }
            }

            pub fn name(self) -> &'static str {
                match self {
                    $(LumpId::$variant => $name,)*
                }
            }
        }
    };
}

lump_ids! {
    Entities = 0 => "entities",
    Planes = 1 => "planes",
    TexData = 2 => "texdata",
    Vertexes = 3 => "vertexes",
    Visibility = 4 => "visibility",
    Nodes = 5 => "nodes",
    TexInfo = 6 => "texinfo",
    Faces = 7 => "faces",
    Lighting = 8 => "lighting",
    Occlusion = 9 => "occlusion",
    Leafs = 10 => "leafs",
    FaceIds = 11 => "faceids",
    Edges = 12 => "edges",
    SurfEdges = 13 => "surfedges",
    Models = 14 => "models",
    WorldLights = 15 => "worldlights",
    LeafFaces = 16 => "leaffaces",
    LeafBrushes = 17 => "leafbrushes",
    Brushes = 18 => "brushes",
    BrushSides = 19 => "brushsides",
    Areas = 20 => "areas",
    AreaPortals = 21 => "areaportals",
    Portals = 22 => "portals",
    Clusters = 23 => "clusters",
    PortalVerts = 24 => "portalverts",
    ClusterPortals = 25 => "clusterportals",
    DispInfo = 26 => "dispinfo",
    OriginalFaces = 27 => "originalfaces",
    PhysDisp = 28 => "physdisp",
    PhysCollide = 29 => "physcollide",
    VertNormals = 30 => "vertnormals",
    VertNormalIndices = 31 => "vertnormalindices",
    DispLightmapAlphas = 32 => "displightmapalphas",
    DispVerts = 33 => "dispverts",
    DispLightmapSamplePositions = 34 => "displightmapsamplepositions",
    GameLump = 35 => "game_lump",
    LeafWaterData = 36 => "leafwaterdata",
    Primitives = 37 => "primitives",
    PrimVerts = 38 => "primverts",
    PrimIndices = 39 => "primindices",
    PakFile = 40 => "pakfile",
    ClipPortalVerts = 41 => "clipportalverts",
    Cubemaps = 42 => "cubemaps",
    TexDataStringData = 43 => "texdata_string_data",
    TexDataStringTable = 44 => "texdata_string_table",
    Overlays = 45 => "overlays",
    LeafMinDistToWater = 46 => "leafmindisttowater",
    FaceMacroTextureInfo = 47 => "face_macro_texture_info",
    DispTris = 48 => "disp_tris",
    PhysCollideSurface = 49 => "physcollidesurface",
    WaterOverlays = 50 => "wateroverlays",
    LightmapPages = 51 => "lightmappages",
    LightmapPageInfos = 52 => "lightmappageinfos",
    LightingHdr = 53 => "lighting_hdr",
    WorldLightsHdr = 54 => "worldlights_hdr",
    LeafAmbientLightingHdr = 55 => "leaf_ambient_lighting_hdr",
    LeafAmbientLighting = 56 => "leaf_ambient_lighting",
    XZipPakFile = 57 => "xzippakfile",
    FacesHdr = 58 => "faces_hdr",
    MapFlags = 59 => "map_flags",
    OverlayFades = 60 => "overlay_fades",
    OverlaySystemLevels = 61 => "overlay_system_levels",
    PhysLevel = 62 => "physlevel",
    DispMultiblend = 63 => "disp_multiblend",
}

impl LumpId {
    pub fn index(self) -> usize {
        self as usize
    }
}

impl From<LumpId> for usize {
    fn from(id: LumpId) -> usize {
        id.index()
    }
}

impl fmt::Display for LumpId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
