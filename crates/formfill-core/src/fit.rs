//! Aspect-ratio-preserving photo sizing

/// Fit natural pixel dimensions into a constraint box, clamping the image's
/// dominant axis first: a landscape photo is clamped to the allowed width
/// before its height is considered, a portrait photo the other way around.
/// This keeps the dominant axis from shrinking further than the box
/// requires. Results are rounded to whole points; dimensions already within
/// the box pass through unchanged.
pub fn fit_within(natural_w: f64, natural_h: f64, max_w: f64, max_h: f64) -> (f64, f64) {
    if natural_w <= 0.0 || natural_h <= 0.0 {
        return (0.0, 0.0);
    }
    let aspect = natural_w / natural_h;
    let (mut w, mut h) = (natural_w, natural_h);

    if natural_w > natural_h {
        // Landscape: width first, then height if still over.
        if w > max_w {
            w = max_w;
            h = w / aspect;
        }
        if h > max_h {
            h = max_h;
            w = h * aspect;
        }
    } else {
        // Portrait (or square): height first, then width if still over.
        if h > max_h {
            h = max_h;
            w = h * aspect;
        }
        if w > max_w {
            w = max_w;
            h = w / aspect;
        }
    }

    (w.round(), h.round())
}
