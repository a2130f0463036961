//! Geometry command stream of vector tile features.
//!
//! Coordinates are tile-local integers relative to the tile's top-left corner,
//! y growing downwards, delta + zig-zag encoded.

pub type TilePoint = (i64, i64);
pub type TilePath = Vec<TilePoint>;

pub const MOVE_TO: u32 = 1;
pub const LINE_TO: u32 = 2;
pub const CLOSE_PATH: u32 = 7;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeometryError {
    Truncated { offset: usize },
    UnknownCommand { id: u32, offset: usize },
    LineToWithoutMoveTo { offset: usize },
    /// An accumulated coordinate left the signed 32-bit range.
    CoordinateOutOfRange { offset: usize },
}

impl std::fmt::Display for GeometryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GeometryError::Truncated { offset } => {
                write!(f, "command stream truncated at offset {offset}")
            }
            GeometryError::UnknownCommand { id, offset } => {
                write!(f, "unknown command {id} at offset {offset}")
            }
            GeometryError::LineToWithoutMoveTo { offset } => {
                write!(f, "LineTo before any MoveTo at offset {offset}")
            }
            GeometryError::CoordinateOutOfRange { offset } => {
                write!(f, "coordinate out of 32-bit range at offset {offset}")
            }
        }
    }
}

impl std::error::Error for GeometryError {}

pub fn zigzag_decode(value: u32) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}

pub fn zigzag_encode(value: i64) -> u32 {
    ((value << 1) ^ (value >> 63)) as u32
}

pub fn command_integer(id: u32, count: u32) -> u32 {
    (id & 0x7) | (count << 3)
}

/// Splits a command stream into paths. Every MoveTo starts a new path, so a
/// multi-point MoveTo yields one single-point path per point; ClosePath
/// repeats the first point of the current path. Absolute coordinates must
/// fit in an `i32`.
pub fn decode_paths(commands: &[u32]) -> Result<Vec<TilePath>, GeometryError> {
    let mut paths: Vec<TilePath> = Vec::new();
    let mut current: TilePath = Vec::new();
    let (mut x, mut y) = (0i64, 0i64);
    let mut i = 0;

    while i < commands.len() {
        let offset = i;
        let id = commands[i] & 0x7;
        let count = (commands[i] >> 3) as usize;
        i += 1;

        match id {
            MOVE_TO | LINE_TO => {
                if id == LINE_TO && current.is_empty() {
                    return Err(GeometryError::LineToWithoutMoveTo { offset });
                }
                for _ in 0..count {
                    let (Some(&dx), Some(&dy)) = (commands.get(i), commands.get(i + 1)) else {
                        return Err(GeometryError::Truncated { offset: i });
                    };
                    x += zigzag_decode(dx);
                    y += zigzag_decode(dy);
                    if i32::try_from(x).is_err() || i32::try_from(y).is_err() {
                        return Err(GeometryError::CoordinateOutOfRange { offset: i });
                    }
                    i += 2;
                    if id == MOVE_TO && !current.is_empty() {
                        paths.push(std::mem::take(&mut current));
                    }
                    current.push((x, y));
                }
            }
            CLOSE_PATH => {
                if let Some(&first) = current.first() {
                    current.push(first);
                }
            }
            other => return Err(GeometryError::UnknownCommand { id: other, offset }),
        }
    }

    if !current.is_empty() {
        paths.push(current);
    }
    Ok(paths)
}

/// Encodes paths as a command stream. Polygon rings are given without the
/// closing point and are terminated with ClosePath.
pub fn encode_paths(paths: &[TilePath], close: bool) -> Vec<u32> {
    let mut out = Vec::new();
    let (mut x, mut y) = (0i64, 0i64);
    for path in paths {
        let Some((&first, rest)) = path.split_first() else {
            continue;
        };
        out.push(command_integer(MOVE_TO, 1));
        out.push(zigzag_encode(first.0 - x));
        out.push(zigzag_encode(first.1 - y));
        (x, y) = first;
        if !rest.is_empty() {
            out.push(command_integer(LINE_TO, rest.len() as u32));
            for &(px, py) in rest {
                out.push(zigzag_encode(px - x));
                out.push(zigzag_encode(py - y));
                (x, y) = (px, py);
            }
        }
        if close {
            out.push(command_integer(CLOSE_PATH, 1));
        }
    }
    out
}

/// Shoelace sum in tile coordinates. Positive for rings that run clockwise
/// on screen (y down). Summed in `i128` so no ring can overflow it.
pub fn signed_area(ring: &[TilePoint]) -> i128 {
    if ring.len() < 3 {
        return 0;
    }
    let mut sum = 0i128;
    for (i, &(x1, y1)) in ring.iter().enumerate() {
        let (x2, y2) = ring[(i + 1) % ring.len()];
        sum += i128::from(x1) * i128::from(y2) - i128::from(x2) * i128::from(y1);
    }
    sum
}

/// Groups rings into polygons. The winding of the first non-degenerate ring
/// marks exterior rings; rings with the opposite winding are holes of the
/// polygon opened most recently. Zero-area rings are dropped.
pub fn classify_rings(rings: Vec<TilePath>) -> Vec<Vec<TilePath>> {
    let mut polygons: Vec<Vec<TilePath>> = Vec::new();
    let mut exterior_positive: Option<bool> = None;

    for ring in rings {
        let area = signed_area(&ring);
        if area == 0 {
            continue;
        }
        let positive = area > 0;
        let exterior = *exterior_positive.get_or_insert(positive);
        if positive == exterior {
            polygons.push(vec![ring]);
        } else if let Some(polygon) = polygons.last_mut() {
            polygon.push(ring);
        }
    }
    polygons
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x: i64, y: i64, size: i64) -> TilePath {
        vec![(x, y), (x + size, y), (x + size, y + size), (x, y + size)]
    }

    fn reversed(mut path: TilePath) -> TilePath {
        path.reverse();
        path
    }

    #[test]
    fn zigzag_matches_protobuf_table() {
        assert_eq!(zigzag_decode(0), 0);
        assert_eq!(zigzag_decode(1), -1);
        assert_eq!(zigzag_decode(2), 1);
        assert_eq!(zigzag_decode(3), -2);
        assert_eq!(zigzag_decode(4294967294), 2147483647);
        for v in [-5000i64, -1, 0, 1, 4096, 8192] {
            assert_eq!(zigzag_decode(zigzag_encode(v)), v);
        }
    }

    #[test]
    fn decodes_worked_example_linestring() {
        // LineString (2,2) (2,10) (10,10) from the format's worked example.
        let cmds = [9, 4, 4, 18, 0, 16, 16, 0];
        let paths = decode_paths(&cmds).unwrap();
        assert_eq!(paths, vec![vec![(2, 2), (2, 10), (10, 10)]]);
    }

    #[test]
    fn multi_point_moveto_yields_one_path_per_point() {
        // MultiPoint (5,7) (3,2).
        let cmds = [17, 10, 14, 3, 9];
        let paths = decode_paths(&cmds).unwrap();
        assert_eq!(paths, vec![vec![(5, 7)], vec![(3, 2)]]);
    }

    #[test]
    fn close_path_repeats_first_point() {
        let cmds = encode_paths(&[square(0, 0, 10)], true);
        let paths = decode_paths(&cmds).unwrap();
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].first(), paths[0].last());
        assert_eq!(paths[0].len(), 5);
    }

    #[test]
    fn malformed_streams_are_rejected() {
        assert_eq!(
            decode_paths(&[command_integer(MOVE_TO, 1), 4]),
            Err(GeometryError::Truncated { offset: 1 })
        );
        assert_eq!(
            decode_paths(&[command_integer(LINE_TO, 1), 2, 2]),
            Err(GeometryError::LineToWithoutMoveTo { offset: 0 })
        );
        assert_eq!(
            decode_paths(&[command_integer(5, 1)]),
            Err(GeometryError::UnknownCommand { id: 5, offset: 0 })
        );
    }

    #[test]
    fn rings_group_into_polygons_with_holes() {
        let outer_a = square(0, 0, 100);
        let hole_a = reversed(square(10, 10, 20));
        let outer_b = square(200, 200, 50);
        let degenerate = vec![(0, 0), (5, 0), (10, 0)];

        let polygons = classify_rings(vec![
            outer_a.clone(),
            hole_a.clone(),
            degenerate,
            outer_b.clone(),
        ]);
        assert_eq!(polygons, vec![vec![outer_a, hole_a], vec![outer_b]]);
    }

    #[test]
    fn screen_clockwise_square_has_positive_area() {
        assert_eq!(signed_area(&square(0, 0, 10)), 200);
        assert_eq!(signed_area(&reversed(square(0, 0, 10))), -200);
    }

    #[test]
    fn coordinates_past_i32_are_rejected() {
        let max = zigzag_encode(i64::from(i32::MAX));
        let cmds = [
            command_integer(MOVE_TO, 1),
            max,
            0,
            command_integer(LINE_TO, 1),
            max,
            0,
        ];
        assert_eq!(
            decode_paths(&cmds),
            Err(GeometryError::CoordinateOutOfRange { offset: 4 })
        );
    }

    #[test]
    fn area_of_full_range_ring_does_not_overflow() {
        let min = i64::from(i32::MIN);
        let side = i64::from(u32::MAX);
        let ring = square(min, min, side);
        assert_eq!(signed_area(&ring), 2 * i128::from(side) * i128::from(side));
        assert_eq!(classify_rings(vec![ring.clone()]), vec![vec![ring]]);
    }
}
