use glam::Vec3;

/// Triangle list in object space. Models carry one of these as a low-detail occluder mesh.
#[derive(Clone, Debug)]
pub struct PolygonSoup {
    pub vertex_positions: Vec<Vec3>,
    pub index: PolygonSoupIndex,
}

#[derive(Clone, Debug)]
pub enum PolygonSoupIndex {
    None,
    Indexed16(Vec<u16>),
    Indexed32(Vec<u32>),
}

impl PolygonSoup {
    pub fn triangle_count(&self) -> usize {
        match &self.index {
            PolygonSoupIndex::None => self.vertex_positions.len() / 3,
            PolygonSoupIndex::Indexed16(indices) => indices.len() / 3,
            PolygonSoupIndex::Indexed32(indices) => indices.len() / 3,
        }
    }

    /// Vertex indices of the i-th triangle
    pub fn triangle(
        &self,
        triangle: usize,
    ) -> [usize; 3] {
        let first = triangle * 3;
        match &self.index {
            PolygonSoupIndex::None => [first, first + 1, first + 2],
            PolygonSoupIndex::Indexed16(indices) => [
                indices[first] as usize,
                indices[first + 1] as usize,
                indices[first + 2] as usize,
            ],
            PolygonSoupIndex::Indexed32(indices) => [
                indices[first] as usize,
                indices[first + 1] as usize,
                indices[first + 2] as usize,
            ],
        }
    }

    /// Two triangles covering the rectangle `min.xy..max.xy` in the XY plane at `z = min.z`
    pub fn quad_xy(
        min: Vec3,
        max: Vec3,
    ) -> Self {
        PolygonSoup {
            vertex_positions: vec![
                Vec3::new(min.x, min.y, min.z),
                Vec3::new(max.x, min.y, min.z),
                Vec3::new(max.x, max.y, min.z),
                Vec3::new(min.x, max.y, min.z),
            ],
            index: PolygonSoupIndex::Indexed16(vec![0, 1, 2, 2, 3, 0]),
        }
    }
}
