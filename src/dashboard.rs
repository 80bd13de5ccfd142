//! Server-rendered dashboard page.
//!
//! The first paint comes from one aggregation cycle. The embedded script then
//! polls `/api/argenstats` on the configured interval, swaps cards to
//! skeletons while loading, shows an inline error with a retry button on
//! failure, and draws the 30-day charts from the historical route (or from a
//! client-side synthetic series when that route is unreachable).

use crate::format::*;
use crate::models::*;
use chrono::{DateTime, Utc};

struct Card {
    key: &'static str,
    title: &'static str,
    value: String,
    detail: String,
    change: Option<f64>,
    real: bool,
}

fn cards(data: &DashboardResponse) -> Vec<Card> {
    let real = |indicator: Indicator| {
        data.metadata
            .api_status
            .get(indicator.key())
            .is_some_and(|s| s == "success")
    };
    let mut cards = Vec::new();

    if let Some(ref fx) = data.exchange_rates {
        let gap = if fx.oficial > 0.0 {
            (fx.blue / fx.oficial - 1.0) * 100.0
        } else {
            0.0
        };
        cards.push(Card {
            key: "oficial",
            title: "Dólar Oficial",
            value: format_currency(fx.oficial),
            detail: format!("Tarjeta {}", format_currency(fx.tarjeta)),
            change: None,
            real: real(Indicator::Dollar),
        });
        cards.push(Card {
            key: "blue",
            title: "Dólar Blue",
            value: format_currency(fx.blue),
            detail: format!("Brecha {}", format_percentage(gap)),
            change: Some(gap),
            real: real(Indicator::Dollar),
        });
        cards.push(Card {
            key: "mep",
            title: "Dólar MEP / CCL",
            value: format_currency(fx.mep),
            detail: format!("CCL {}", format_currency(fx.ccl)),
            change: None,
            real: real(Indicator::Dollar),
        });
    }
    if let Some(ref ipc) = data.inflation {
        cards.push(Card {
            key: "inflation",
            title: "Inflación mensual",
            value: format_percentage(ipc.monthly),
            detail: format!(
                "Interanual {} · Acumulada {}",
                format_percentage(ipc.annual),
                format_percentage(ipc.accumulated)
            ),
            change: Some(ipc.monthly),
            real: real(Indicator::Inflation),
        });
    }
    if let Some(ref emae) = data.emae {
        cards.push(Card {
            key: "emae",
            title: "Actividad (EMAE)",
            value: format_percentage(emae.annual),
            detail: format!("Mensual {}", format_percentage(emae.monthly)),
            change: Some(emae.annual),
            real: real(Indicator::Emae),
        });
    }
    if let Some(ref risk) = data.riesgo_pais {
        cards.push(Card {
            key: "riesgoPais",
            title: "Riesgo País",
            value: format!("{} pb", format_number(risk.value as f64)),
            detail: format!("Variación {}", format_percentage(risk.variation_pct)),
            change: Some(risk.variation_pct),
            real: real(Indicator::RiesgoPais),
        });
    }
    if let Some(ref labor) = data.labor_market {
        cards.push(Card {
            key: "laborMarket",
            title: "Desempleo",
            value: format_percentage(labor.unemployment),
            detail: format!(
                "Empleo {} · Actividad {}",
                format_percentage(labor.employment),
                format_percentage(labor.activity)
            ),
            change: None,
            real: real(Indicator::LaborMarket),
        });
    }
    if let Some(ref poverty) = data.poverty {
        cards.push(Card {
            key: "poverty",
            title: "Pobreza",
            value: format_percentage(poverty.poverty_rate),
            detail: format!(
                "{} personas · {}",
                format_number(poverty.poverty_population as f64),
                poverty.period
            ),
            change: None,
            real: real(Indicator::Poverty),
        });
    }

    cards
}

fn render_card(out: &mut String, card: &Card) {
    let badge = if card.real {
        r#"<span class="badge real">Datos reales</span>"#
    } else {
        r#"<span class="badge fallback">Referencia</span>"#
    };
    let change = card
        .change
        .map(|c| {
            format!(
                r#"<span class="change {}">{}</span>"#,
                change_class(c),
                change_icon(c)
            )
        })
        .unwrap_or_default();
    out.push_str(&format!(
        r#"<article class="card" data-key="{key}"><header><h2>{title}</h2>{badge}</header><p class="value">{value} {change}</p><p class="detail">{detail}</p></article>"#,
        key = card.key,
        title = escape_html(card.title),
        badge = badge,
        value = escape_html(&card.value),
        change = change,
        detail = escape_html(&card.detail),
    ));
}

fn render_calendar(out: &mut String, events: &[CalendarEvent]) {
    out.push_str(r#"<section class="panel"><h2>Próximas publicaciones INDEC</h2><ul class="calendar">"#);
    for event in events {
        let when = crate::normalize::parse_timestamp(&event.date)
            .map(|d| format_long_date(d.date_naive()))
            .unwrap_or_else(|| event.date.clone());
        out.push_str(&format!(
            "<li><strong>{}</strong> {} · {} <small>({})</small></li>",
            escape_html(&event.day_week),
            escape_html(&when),
            escape_html(&event.indicator),
            escape_html(&event.period)
        ));
    }
    out.push_str("</ul></section>");
}

fn render_sectors(out: &mut String, sectors: &[EmaeSector]) {
    out.push_str(r#"<section class="panel"><h2>EMAE por sector</h2><table class="sectors"><tbody>"#);
    for sector in sectors {
        out.push_str(&format!(
            r#"<tr><td>{}</td><td class="{}">{} {}</td><td>{}</td></tr>"#,
            escape_html(&sector.sector),
            change_class(sector.annual_variation),
            change_icon(sector.annual_variation),
            format_percentage(sector.annual_variation),
            format_decimal(sector.index_value, 1)
        ));
    }
    out.push_str("</tbody></table></section>");
}

fn updated_at(timestamp: DateTime<Utc>) -> String {
    format!(
        "{} {}",
        format_long_date(timestamp.date_naive()),
        timestamp.format("%H:%M UTC")
    )
}

/// Renders the full page for one aggregation result.
///
/// # Arguments
///
/// * `data` - Result of the aggregation cycle used for the first paint.
/// * `refresh_secs` - Polling interval of the embedded script.
pub fn render(data: &DashboardResponse, refresh_secs: u64) -> String {
    let mut body = String::new();
    for card in cards(data) {
        render_card(&mut body, &card);
    }

    let mut panels = String::new();
    if let Some(ref events) = data.calendar {
        render_calendar(&mut panels, events);
    }
    if let Some(ref sectors) = data.emae_sectors {
        render_sectors(&mut panels, sectors);
    }

    let status = format!(
        "{} · {} de {} indicadores en vivo · Actualizado {}",
        data.metadata.source,
        data.metadata.successful_apis,
        data.metadata.successful_apis + data.metadata.failed_apis,
        updated_at(data.metadata.timestamp)
    );

    PAGE_TEMPLATE
        .replace("{{STATUS}}", &escape_html(&status))
        .replace("{{CARDS}}", &body)
        .replace("{{PANELS}}", &panels)
        .replace("{{REFRESH_MS}}", &(refresh_secs.saturating_mul(1000)).to_string())
}

const PAGE_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="es-AR">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Dashboard Económico Argentina</title>
    <style>
        body { margin: 0; font-family: system-ui, sans-serif; background: #f4f6f9; color: #1c2733; }
        main { max-width: 1100px; margin: 0 auto; padding: 24px; }
        .status { color: #5b6b7c; font-size: 0.9rem; }
        .grid { display: grid; grid-template-columns: repeat(auto-fill, minmax(240px, 1fr)); gap: 16px; }
        .card, .panel { background: #fff; border-radius: 10px; padding: 16px; box-shadow: 0 1px 3px rgba(0,0,0,.08); }
        .card header { display: flex; justify-content: space-between; align-items: center; }
        .card h2, .panel h2 { font-size: 1rem; margin: 0; }
        .value { font-size: 1.6rem; font-weight: 600; margin: 12px 0 4px; }
        .detail { color: #5b6b7c; margin: 0; }
        .badge { font-size: 0.7rem; padding: 2px 8px; border-radius: 999px; }
        .badge.real { background: #e3f6e8; color: #1d7a3a; }
        .badge.fallback { background: #fdf1dc; color: #9a6200; }
        .up { color: #1d7a3a; } .down { color: #b3261e; } .flat { color: #5b6b7c; }
        .skeleton .value, .skeleton .detail { background: #e6eaef; color: transparent; border-radius: 4px; }
        .panels { display: grid; grid-template-columns: repeat(auto-fit, minmax(320px, 1fr)); gap: 16px; margin-top: 16px; }
        .error { display: none; background: #fdecea; color: #b3261e; padding: 12px 16px; border-radius: 8px; margin: 16px 0; }
        .error.visible { display: flex; justify-content: space-between; align-items: center; }
        canvas { width: 100%; height: 220px; }
        table { width: 100%; border-collapse: collapse; font-size: 0.85rem; }
        td { padding: 4px 0; border-bottom: 1px solid #eef1f4; }
    </style>
</head>
<body>
<main>
    <h1>Dashboard Económico Argentina</h1>
    <p class="status" id="status">{{STATUS}}</p>
    <div class="error" id="error"><span id="error-message">No se pudieron cargar los datos.</span><button id="retry" type="button">Reintentar</button></div>
    <section class="grid" id="cards">{{CARDS}}</section>
    <section class="panels">
        <section class="panel"><h2>Dólar oficial y blue (30 días)</h2><canvas id="dollar-chart" width="520" height="220"></canvas></section>
        <section class="panel"><h2>Inflación mensual (12 meses)</h2><canvas id="inflation-chart" width="520" height="220"></canvas></section>
        {{PANELS}}
    </section>
</main>
<script>
(function () {
    const REFRESH_MS = {{REFRESH_MS}};
    const money = new Intl.NumberFormat('es-AR', { style: 'currency', currency: 'ARS', minimumFractionDigits: 2 });
    const pct = (v) => new Intl.NumberFormat('es-AR', { minimumFractionDigits: 2, maximumFractionDigits: 2 }).format(v) + ' %';
    const icon = (v) => (v > 0 ? '↗' : v < 0 ? '↘' : '→');
    const cls = (v) => (v > 0 ? 'up' : v < 0 ? 'down' : 'flat');
    const el = (id) => document.getElementById(id);
    let state = 'loading';

    function setState(next, message) {
        state = next;
        document.querySelectorAll('.card').forEach((c) => c.classList.toggle('skeleton', next === 'loading'));
        el('error').classList.toggle('visible', next === 'error');
        if (message) el('error-message').textContent = message;
    }

    function setCard(key, value, detail, change, real) {
        const card = document.querySelector('.card[data-key="' + key + '"]');
        if (!card) return;
        const change_html = change === null ? '' : ' <span class="change ' + cls(change) + '">' + icon(change) + '</span>';
        card.querySelector('.value').innerHTML = value + change_html;
        card.querySelector('.detail').textContent = detail;
        const badge = card.querySelector('.badge');
        badge.className = 'badge ' + (real ? 'real' : 'fallback');
        badge.textContent = real ? 'Datos reales' : 'Referencia';
    }

    function render(data) {
        const status = data.metadata.api_status || {};
        const real = (k) => status[k] === 'success';
        const fx = data.exchangeRates;
        if (fx) {
            const gap = fx.oficial > 0 ? (fx.blue / fx.oficial - 1) * 100 : 0;
            setCard('oficial', money.format(fx.oficial), 'Tarjeta ' + money.format(fx.tarjeta), null, real('dollar'));
            setCard('blue', money.format(fx.blue), 'Brecha ' + pct(gap), gap, real('dollar'));
            setCard('mep', money.format(fx.mep), 'CCL ' + money.format(fx.ccl), null, real('dollar'));
        }
        if (data.inflation) {
            const i = data.inflation;
            setCard('inflation', pct(i.monthly), 'Interanual ' + pct(i.annual) + ' · Acumulada ' + pct(i.accumulated), i.monthly, real('inflation'));
        }
        if (data.emae) setCard('emae', pct(data.emae.annual), 'Mensual ' + pct(data.emae.monthly), data.emae.annual, real('emae'));
        if (data.riesgoPais) {
            const r = data.riesgoPais;
            setCard('riesgoPais', r.value.toLocaleString('es-AR') + ' pb', 'Variación ' + pct(r.variation_pct), r.variation_pct, real('riesgoPais'));
        }
        if (data.laborMarket) {
            const l = data.laborMarket;
            setCard('laborMarket', pct(l.unemployment), 'Empleo ' + pct(l.employment) + ' · Actividad ' + pct(l.activity), null, real('laborMarket'));
        }
        if (data.poverty) {
            const p = data.poverty;
            setCard('poverty', pct(p.poverty_rate), p.poverty_population.toLocaleString('es-AR') + ' personas · ' + p.period, null, real('poverty'));
        }
        const live = data.metadata.successful_apis;
        const total = live + data.metadata.failed_apis;
        el('status').textContent = data.metadata.source + ' · ' + live + ' de ' + total + ' indicadores en vivo · Actualizado ' + new Date(data.metadata.timestamp).toLocaleString('es-AR');
    }

    function syntheticHistory() {
        const dollar = [];
        const today = new Date();
        for (let i = 29; i >= 0; i--) {
            const d = new Date(today.getTime() - i * 86400000);
            const oficial = 1290 - i * 0.5 + (Math.random() - 0.5) * 15;
            dollar.push({ date: d.toISOString().slice(0, 10), oficial: oficial, blue: oficial * (1.4 + Math.random() * 0.1) });
        }
        const inflation = [20.6, 13.2, 11.0, 8.8, 4.2, 4.6, 4.0, 4.2, 3.5, 2.7, 2.4, 2.5].map((v, i) => ({ month: 'Mes ' + (i + 1), value: v }));
        return { dollarHistory: dollar, inflationHistory: inflation };
    }

    function drawLines(canvas, series, colors) {
        const ctx = canvas.getContext('2d');
        ctx.clearRect(0, 0, canvas.width, canvas.height);
        const all = series.flat();
        if (all.length === 0) return;
        const min = Math.min(...all), max = Math.max(...all);
        const span = max - min || 1;
        series.forEach((values, s) => {
            ctx.strokeStyle = colors[s];
            ctx.lineWidth = 2;
            ctx.beginPath();
            values.forEach((v, i) => {
                const x = (i / Math.max(values.length - 1, 1)) * (canvas.width - 20) + 10;
                const y = canvas.height - 10 - ((v - min) / span) * (canvas.height - 20);
                if (i === 0) ctx.moveTo(x, y); else ctx.lineTo(x, y);
            });
            ctx.stroke();
        });
    }

    function drawHistory(history) {
        const dollar = history.dollarHistory || [];
        drawLines(el('dollar-chart'), [dollar.map((p) => p.oficial), dollar.map((p) => p.blue)], ['#1f6feb', '#0f9d58']);
        const inflation = history.inflationHistory || [];
        drawLines(el('inflation-chart'), [inflation.map((p) => p.value)], ['#d93025']);
    }

    async function loadHistory() {
        try {
            const res = await fetch('/api/argenstats/historical?type=all&days=30&months=12');
            if (!res.ok) throw new Error('HTTP ' + res.status);
            drawHistory(await res.json());
        } catch (e) {
            drawHistory(syntheticHistory());
        }
    }

    async function load() {
        setState('loading');
        try {
            const res = await fetch('/api/argenstats', { cache: 'no-store' });
            if (!res.ok) throw new Error('HTTP ' + res.status);
            render(await res.json());
            setState('success');
        } catch (e) {
            setState('error', 'No se pudieron cargar los datos (' + e.message + ').');
        }
    }

    el('retry').addEventListener('click', () => { load(); loadHistory(); });
    load();
    loadHistory();
    const timer = setInterval(() => { load(); loadHistory(); }, REFRESH_MS);
    window.addEventListener('pagehide', () => clearInterval(timer));
})();
</script>
</body>
</html>
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::settle;
    use crate::errors::FetchError;

    fn fallback_dashboard() -> DashboardResponse {
        let now = Utc::now();
        let mut result = AggregationResult::default();
        for indicator in Indicator::ALL {
            settle(
                &mut result,
                indicator,
                Err(FetchError::Network("unreachable".to_string())),
                now,
            );
        }
        DashboardResponse::from_aggregation(result, now, false)
    }

    #[test]
    fn test_render_fallback_page() {
        let html = render(&fallback_dashboard(), 300);
        assert!(html.contains("$ 1.290,00"));
        assert!(html.contains("$ 1.325,00"));
        assert!(html.contains("Reintentar"));
        assert!(html.contains("const REFRESH_MS = 300000;"));
        assert!(html.contains("Fallback data"));
        assert!(!html.contains(r#"<span class="badge real">"#));
        assert!(!html.contains("{{"));
    }

    #[test]
    fn test_panels_render_every_row() {
        let html = render(&fallback_dashboard(), 300);
        assert!(html.contains(r#"<article class="card" data-key="oficial">"#));
        assert_eq!(html.matches("<li><strong>").count(), 2);
        assert!(html.contains(
            r#"<tr><td>Pesca</td><td class="down">↘ -1,50 %</td><td>98,7</td></tr>"#
        ));
        assert_eq!(html.matches("<tr><td>").count(), 14);
    }

    #[test]
    fn test_real_badge_follows_status() {
        let mut data = fallback_dashboard();
        data.metadata
            .api_status
            .insert("dollar".to_string(), "success".to_string());
        let html = render(&data, 60);
        assert!(html.contains(r#"<span class="badge real">Datos reales</span>"#));
    }
}
