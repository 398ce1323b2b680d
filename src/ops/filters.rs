// ============================================================================
// FILTERS: one-shot colour transforms applied straight to the active layer
// ============================================================================
//
// Unlike slider adjustments these are destructive: they mutate whatever is on
// the layer now and are not replayed from the adjustment original.  A later
// slider move therefore recomputes from the original and drops the filter.
// ============================================================================

use std::fmt;
use std::str::FromStr;

use crate::canvas::PixelBuffer;
use crate::error::EditorError;
use crate::ops::adjustments::apply_pixel_transform;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Filter {
    /// Lift bright pixels, sink dark ones, with extra weight on blue.
    Moon,
    /// Warm shift: +20 red/green, -20 blue.
    Hudson,
    /// Classic sepia matrix ("vintage").
    Retro,
    /// Weighted luma to gray.
    BlackAndWhite,
}

impl Filter {
    pub const ALL: [Filter; 4] = [Filter::Moon, Filter::Hudson, Filter::Retro, Filter::BlackAndWhite];

    pub fn name(self) -> &'static str {
        match self {
            Filter::Moon => "moon",
            Filter::Hudson => "hudson",
            Filter::Retro => "retro",
            Filter::BlackAndWhite => "black-and-white",
        }
    }

    pub fn apply(self, buf: &mut PixelBuffer) {
        match self {
            Filter::Moon => apply_pixel_transform(buf, |r, g, b, a| {
                let avg = (r + g + b) / 3.0;
                if avg > 128.0 {
                    (r + 10.0, g + 10.0, b + 20.0, a)
                } else {
                    (r - 10.0, g - 10.0, b - 20.0, a)
                }
            }),
            Filter::Hudson => {
                apply_pixel_transform(buf, |r, g, b, a| (r + 20.0, g + 20.0, b - 20.0, a))
            }
            Filter::Retro => apply_pixel_transform(buf, |r, g, b, a| {
                let sr = 0.393 * r + 0.769 * g + 0.189 * b;
                let sg = 0.349 * r + 0.686 * g + 0.168 * b;
                let sb = 0.272 * r + 0.534 * g + 0.131 * b;
                (sr.min(255.0), sg.min(255.0), sb.min(255.0), a)
            }),
            Filter::BlackAndWhite => apply_pixel_transform(buf, |r, g, b, a| {
                let luma = 0.3 * r + 0.59 * g + 0.11 * b;
                (luma, luma, luma, a)
            }),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Filter {
    type Err = EditorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "moon" => Ok(Filter::Moon),
            "hudson" => Ok(Filter::Hudson),
            "retro" | "vintage" => Ok(Filter::Retro),
            "black-and-white" | "blackandwhite" | "bw" | "b&w" => Ok(Filter::BlackAndWhite),
            _ => Err(EditorError::UnknownFilter(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn one(c: [u8; 4]) -> PixelBuffer {
        PixelBuffer::new_filled(1, 1, c)
    }

    #[test]
    fn parses_aliases() {
        assert_eq!("vintage".parse::<Filter>().unwrap(), Filter::Retro);
        assert_eq!("Black_And_White".parse::<Filter>().unwrap(), Filter::BlackAndWhite);
        assert!("lomo".parse::<Filter>().is_err());
        for f in Filter::ALL {
            assert_eq!(f.name().parse::<Filter>().unwrap(), f);
        }
    }

    #[test]
    fn moon_splits_on_average() {
        let mut bright = one([200, 200, 240, 255]);
        Filter::Moon.apply(&mut bright);
        assert_eq!(bright.get_pixel(0, 0), Rgba([210, 210, 255, 255]));

        let mut dark = one([10, 50, 15, 90]);
        Filter::Moon.apply(&mut dark);
        assert_eq!(dark.get_pixel(0, 0), Rgba([0, 40, 0, 90]));
    }

    #[test]
    fn hudson_and_bw() {
        let mut b = one([100, 250, 10, 255]);
        Filter::Hudson.apply(&mut b);
        assert_eq!(b.get_pixel(0, 0), Rgba([120, 255, 0, 255]));

        let mut b = one([100, 100, 100, 3]);
        Filter::BlackAndWhite.apply(&mut b);
        assert_eq!(b.get_pixel(0, 0), Rgba([100, 100, 100, 3]));
    }

    #[test]
    fn retro_saturates_white() {
        let mut b = one([255, 255, 255, 255]);
        Filter::Retro.apply(&mut b);
        // blue row sums to 0.937
        assert_eq!(b.get_pixel(0, 0), Rgba([255, 255, 239, 255]));
    }
}
