use crate::types::Token;

/// Reorder tokens top-to-bottom, then left-to-right.
///
/// Tokens are scanned by vertical centre; a token joins the current band while
/// its centre stays within `tolerance × median height` of the band's first
/// centre. Bands are emitted in order, each sorted by left edge. Ties keep the
/// engine's order.
pub fn sort_reading_order(tokens: Vec<Token>, tolerance: f32) -> Vec<Token> {
    if tokens.len() < 2 {
        return tokens;
    }
    let band_height = median_height(&tokens) * tolerance.max(0.0);

    let mut by_row = tokens;
    by_row.sort_by(|a, b| a.position.center_y().total_cmp(&b.position.center_y()));

    let mut bands: Vec<Vec<Token>> = Vec::new();
    let mut band_top = f32::NEG_INFINITY;
    for token in by_row {
        let cy = token.position.center_y();
        match bands.last_mut() {
            Some(band) if cy - band_top <= band_height => band.push(token),
            _ => {
                band_top = cy;
                bands.push(vec![token]);
            }
        }
    }

    bands
        .into_iter()
        .flat_map(|mut band| {
            band.sort_by(|a, b| a.position.min_x().total_cmp(&b.position.min_x()));
            band
        })
        .collect()
}

fn median_height(tokens: &[Token]) -> f32 {
    let mut heights: Vec<f32> = tokens.iter().map(|t| t.position.height()).collect();
    heights.sort_by(f32::total_cmp);
    heights[heights.len() / 2]
}

#[cfg(test)]
mod tests {
    use super::*;
    use medbill_core::Quad;

    fn at(text: &str, x: f32, y: f32) -> Token {
        Token::new(text, Quad::from_rect(x, y, 60.0, 12.0), 0.9)
    }

    fn texts(tokens: &[Token]) -> Vec<&str> {
        tokens.iter().map(|t| t.text.as_str()).collect()
    }

    #[test]
    fn shuffled_rows_come_back_in_reading_order() {
        let shuffled = vec![
            at("$75", 300.0, 41.0),
            at("X-Ray", 10.0, 10.0),
            at("Consultation", 10.0, 40.0),
            at("$150.00", 300.0, 12.0),
        ];
        let ordered = sort_reading_order(shuffled, 0.5);
        assert_eq!(texts(&ordered), ["X-Ray", "$150.00", "Consultation", "$75"]);
    }

    #[test]
    fn zero_tolerance_orders_by_centre_only() {
        let tokens = vec![at("b", 0.0, 11.0), at("a", 100.0, 10.0)];
        let ordered = sort_reading_order(tokens, 0.0);
        assert_eq!(texts(&ordered), ["a", "b"]);
    }

    #[test]
    fn short_inputs_pass_through() {
        assert!(sort_reading_order(vec![], 0.5).is_empty());
        let one = sort_reading_order(vec![at("x", 5.0, 5.0)], 0.5);
        assert_eq!(texts(&one), ["x"]);
    }

    #[test]
    fn same_position_keeps_engine_order() {
        let tokens = vec![at("first", 10.0, 10.0), at("second", 10.0, 10.0)];
        assert_eq!(texts(&sort_reading_order(tokens, 0.5)), ["first", "second"]);
    }
}
