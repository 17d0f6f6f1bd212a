//! Rendering: expression → plain text or LaTeX.
//!
//! Both renderers work on any [`Expr`], normalized or not. Products are split
//! into a numerator and a denominator so that `x0 * x1**-1` reads as `x0/x1`
//! (plain) or `\frac{x_{0}}{x_{1}}` (LaTeX).

use num_traits::{One, Signed};

use super::rational::{self, RationalExt};
use super::{Expr, Func, Rational};

// Binding strength of rendered fragments; a child is parenthesized when it
// binds looser than its context requires.
const SUM: u8 = 1;
const NEG: u8 = 2;
const PROD: u8 = 3;
const POW: u8 = 4;
const ATOM: u8 = 5;

struct Fragment {
    text: String,
    prec: u8,
}

impl Fragment {
    fn new(text: impl Into<String>, prec: u8) -> Self {
        Self {
            text: text.into(),
            prec,
        }
    }
}

/// Flatten a product tree and split its factors by exponent sign.
///
/// Returns `(numerator, denominator)`; denominator factors have their
/// exponent negated so they render as positive powers.
fn split_fraction(expr: &Expr, all_negative_powers: bool) -> (Vec<Expr>, Vec<Expr>) {
    fn flatten<'e>(e: &'e Expr, out: &mut Vec<&'e Expr>) {
        match e {
            Expr::Mul(a, b) => {
                flatten(a, out);
                flatten(b, out);
            }
            other => out.push(other),
        }
    }

    let mut factors = Vec::new();
    flatten(expr, &mut factors);
    let in_product = matches!(expr, Expr::Mul(..));

    let mut numer = Vec::new();
    let mut denom = Vec::new();
    for factor in factors {
        match factor {
            Expr::Pow(base, exp) => match exp.as_num() {
                Some(e) if e.is_negative() && (all_negative_powers || in_product) => {
                    match e.checked_neg() {
                        Some(pos) => denom.push(positive_power(base, pos)),
                        None => numer.push(factor.clone()),
                    }
                }
                _ => numer.push(factor.clone()),
            },
            Expr::Div(a, b) => {
                numer.push((**a).clone());
                denom.push((**b).clone());
            }
            other => numer.push(other.clone()),
        }
    }
    (numer, denom)
}

fn positive_power(base: &Expr, exp: Rational) -> Expr {
    if exp.is_one() {
        base.clone()
    } else {
        Expr::pow(base.clone(), Expr::Num(exp))
    }
}

// ---------------------------------------------------------------------------
// Plain text
// ---------------------------------------------------------------------------

/// Render in the conventional `**`-for-power text form, e.g. `1/sqrt(x0)`.
pub fn plain(expr: &Expr) -> String {
    plain_fragment(expr).text
}

fn plain_wrap(expr: &Expr, min_prec: u8) -> String {
    let frag = plain_fragment(expr);
    if frag.prec < min_prec {
        format!("({})", frag.text)
    } else {
        frag.text
    }
}

fn plain_fragment(expr: &Expr) -> Fragment {
    match expr {
        Expr::Num(c) => {
            let prec = if c.is_negative() {
                NEG
            } else if c.is_integer() {
                ATOM
            } else {
                PROD
            };
            Fragment::new(c.to_string(), prec)
        }
        Expr::Var(name) => Fragment::new(name.clone(), ATOM),
        Expr::Neg(a) => Fragment::new(format!("-{}", plain_wrap(a, PROD)), NEG),
        Expr::Add(a, b) => {
            let lhs = plain_wrap(a, SUM);
            let text = match &**b {
                Expr::Neg(c) => format!("{lhs} - {}", plain_wrap(c, PROD)),
                Expr::Num(c) if c.is_negative() => match c.checked_neg() {
                    Some(abs) => format!("{lhs} - {}", plain_wrap(&Expr::Num(abs), PROD)),
                    None => format!("{lhs} + {}", plain_wrap(b, PROD)),
                },
                _ => format!("{lhs} + {}", plain_wrap(b, SUM)),
            };
            Fragment::new(text, SUM)
        }
        Expr::Sub(a, b) => Fragment::new(
            format!("{} - {}", plain_wrap(a, SUM), plain_wrap(b, PROD)),
            SUM,
        ),
        Expr::Mul(..) | Expr::Div(..) => plain_fraction(expr),
        Expr::Pow(base, exp) => match exp.as_num() {
            Some(e) if e == rational::HALF => Fragment::new(format!("sqrt({})", plain(base)), ATOM),
            Some(e) if e == rational::MINUS_ONE => {
                Fragment::new(format!("1/{}", plain_wrap(base, POW)), PROD)
            }
            Some(e) if e == rational::MINUS_HALF => {
                Fragment::new(format!("1/sqrt({})", plain(base)), PROD)
            }
            _ => Fragment::new(
                format!("{}**{}", plain_wrap(base, ATOM), plain_wrap(exp, ATOM)),
                POW,
            ),
        },
        Expr::Call(func, a) => Fragment::new(format!("{}({})", func.name(), plain(a)), ATOM),
    }
}

fn plain_fraction(expr: &Expr) -> Fragment {
    let (numer, denom) = split_fraction(expr, false);

    let join = |factors: &[Expr]| {
        factors
            .iter()
            .enumerate()
            .map(|(i, f)| plain_wrap(f, if i == 0 { NEG } else { POW }))
            .collect::<Vec<_>>()
            .join("*")
    };

    let numer_text = if numer.is_empty() {
        "1".to_string()
    } else {
        join(&numer)
    };
    let prec = if numer.len() == 1 && denom.is_empty() {
        plain_fragment(&numer[0]).prec.min(PROD)
    } else {
        PROD
    };
    if denom.is_empty() {
        return Fragment::new(numer_text, prec);
    }

    let denom_text = if denom.len() == 1 {
        plain_wrap(&denom[0], POW)
    } else {
        format!("({})", join(&denom))
    };
    let numer_text = if numer.len() == 1 {
        plain_wrap(&numer[0], PROD)
    } else {
        numer_text
    };
    Fragment::new(format!("{numer_text}/{denom_text}"), PROD)
}

// ---------------------------------------------------------------------------
// LaTeX
// ---------------------------------------------------------------------------

const GREEK: &[&str] = &[
    "alpha", "beta", "gamma", "delta", "epsilon", "zeta", "eta", "theta", "iota", "kappa",
    "lambda", "mu", "nu", "xi", "pi", "rho", "sigma", "tau", "upsilon", "phi", "chi", "psi",
    "omega",
];

/// Render as LaTeX, e.g. `\frac{1}{\sqrt{x_{0}}}`.
pub fn latex(expr: &Expr) -> String {
    latex_fragment(expr).text
}

/// Typeset a variable name: trailing digits and `_suffix` become subscripts,
/// Greek letter names become their commands.
pub fn latex_symbol(name: &str) -> String {
    fn base(name: &str) -> String {
        if GREEK.contains(&name) {
            format!("\\{name}")
        } else {
            name.to_string()
        }
    }

    if let Some((head, tail)) = name.split_once('_') {
        if !head.is_empty() && !tail.is_empty() {
            return format!("{}_{{{}}}", base(head), tail.replace('_', "\\_"));
        }
    }
    let digits_at = name
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map(|(i, _)| i);
    match digits_at {
        Some(i) if i > 0 => format!("{}_{{{}}}", base(&name[..i]), &name[i..]),
        _ => base(name).replace('_', "\\_"),
    }
}

fn latex_wrap(expr: &Expr, min_prec: u8) -> String {
    let frag = latex_fragment(expr);
    if frag.prec < min_prec {
        format!("\\left({}\\right)", frag.text)
    } else {
        frag.text
    }
}

fn latex_rational(c: Rational) -> Fragment {
    if c.is_integer() {
        let prec = if c.is_negative() { NEG } else { ATOM };
        return Fragment::new(c.to_string(), prec);
    }
    let frac = format!("\\frac{{{}}}{{{}}}", c.numer().unsigned_abs(), c.denom());
    if c.is_negative() {
        Fragment::new(format!("- {frac}"), NEG)
    } else {
        Fragment::new(frac, PROD)
    }
}

fn latex_fragment(expr: &Expr) -> Fragment {
    match expr {
        Expr::Num(c) => latex_rational(*c),
        Expr::Var(name) => Fragment::new(latex_symbol(name), ATOM),
        Expr::Neg(a) => Fragment::new(format!("- {}", latex_wrap(a, PROD)), NEG),
        Expr::Add(a, b) => {
            let lhs = latex_wrap(a, SUM);
            let text = match &**b {
                Expr::Neg(c) => format!("{lhs} - {}", latex_wrap(c, PROD)),
                Expr::Num(c) if c.is_negative() => match c.checked_neg() {
                    Some(abs) => format!("{lhs} - {}", latex_rational(abs).text),
                    None => format!("{lhs} + {}", latex_wrap(b, PROD)),
                },
                _ => format!("{lhs} + {}", latex_wrap(b, SUM)),
            };
            Fragment::new(text, SUM)
        }
        Expr::Sub(a, b) => Fragment::new(
            format!("{} - {}", latex_wrap(a, SUM), latex_wrap(b, PROD)),
            SUM,
        ),
        Expr::Mul(..) | Expr::Div(..) => latex_fraction(expr),
        Expr::Pow(base, exp) => match exp.as_num() {
            Some(e) if e.is_negative() => latex_fraction(expr),
            Some(e) if e == rational::HALF => {
                Fragment::new(format!("\\sqrt{{{}}}", latex(base)), ATOM)
            }
            Some(e) if *e.numer() == 1 && *e.denom() > 1 => Fragment::new(
                format!("\\sqrt[{}]{{{}}}", e.denom(), latex(base)),
                ATOM,
            ),
            _ => Fragment::new(
                format!("{}^{{{}}}", latex_wrap(base, ATOM), latex(exp)),
                POW,
            ),
        },
        Expr::Call(func, a) => {
            let arg = latex(a);
            let text = match func {
                Func::Sqrt => format!("\\sqrt{{{arg}}}"),
                Func::Exp => format!("e^{{{arg}}}"),
                Func::Abs => format!("\\left|{{{arg}}}\\right|"),
                Func::Log | Func::Sin | Func::Cos | Func::Tan => {
                    format!("\\{}{{\\left({arg} \\right)}}", func.name())
                }
            };
            let prec = if *func == Func::Exp { POW } else { ATOM };
            Fragment::new(text, prec)
        }
    }
}

fn latex_fraction(expr: &Expr) -> Fragment {
    let (numer, denom) = split_fraction(expr, true);

    let join = |factors: &[Expr]| {
        factors
            .iter()
            .enumerate()
            .map(|(i, f)| latex_wrap(f, if i == 0 { NEG } else { POW }))
            .collect::<Vec<_>>()
            .join(" ")
    };

    if denom.is_empty() {
        let prec = if numer.len() == 1 {
            latex_fragment(&numer[0]).prec.min(PROD)
        } else {
            PROD
        };
        return Fragment::new(join(&numer), prec);
    }

    let numer_text = if numer.is_empty() {
        "1".to_string()
    } else {
        join(&numer)
    };
    Fragment::new(format!("\\frac{{{numer_text}}}{{{}}}", join(&denom)), PROD)
}
