use axum::{
    http::header,
    response::{Html, IntoResponse},
};

/// Embedded live viewer: one uPlot chart per channel fed from `/api/stream`.
pub async fn dashboard() -> impl IntoResponse {
    (
        [(header::CACHE_CONTROL, "public, max-age=60")],
        Html(DASHBOARD_HTML),
    )
}

const DASHBOARD_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Weather Station</title>
    <link rel="stylesheet" href="https://cdn.jsdelivr.net/npm/uplot@1.6.31/dist/uPlot.min.css">
    <style>
        :root {
            --bg: #0f172a;
            --surface: #1e293b;
            --border: #334155;
            --text: #f1f5f9;
            --muted: #94a3b8;
            --alert: #dc2626;
        }
        * { box-sizing: border-box; margin: 0; padding: 0; }
        body { font-family: system-ui, -apple-system, sans-serif; background: var(--bg); color: var(--text); min-height: 100vh; }
        .container { max-width: 1400px; margin: 0 auto; padding: 1.5rem; }
        header { display: flex; justify-content: space-between; align-items: center; margin-bottom: 1.5rem; gap: 1rem; flex-wrap: wrap; }
        h1 { font-size: 1.25rem; font-weight: 600; }
        .actions { display: flex; gap: 0.5rem; align-items: center; }
        button { padding: 0.5rem 1rem; border: 1px solid var(--border); border-radius: 0.375rem; background: var(--surface); color: var(--text); cursor: pointer; }
        button:disabled { opacity: 0.5; cursor: wait; }
        .status { font-size: 0.8rem; color: var(--muted); }
        .grid { display: grid; grid-template-columns: repeat(auto-fill, minmax(420px, 1fr)); gap: 1rem; }
        .card { background: var(--surface); border: 1px solid var(--border); border-radius: 0.5rem; padding: 1rem; }
        .card h2 { font-size: 0.9rem; font-weight: 500; margin-bottom: 0.5rem; }
        #alert { display: none; background: var(--alert); padding: 0.75rem 1rem; border-radius: 0.375rem; margin-bottom: 1rem; }
        #report { display: none; margin-bottom: 1rem; white-space: pre-wrap; font-size: 0.85rem; }
    </style>
</head>
<body>
<div class="container">
    <header>
        <h1>Weather Station</h1>
        <div class="actions">
            <span class="status" id="connection">connecting…</span>
            <span class="status" id="push-status"></span>
            <button id="report-btn">Generate report</button>
        </div>
    </header>
    <div id="alert"></div>
    <div id="report" class="card"></div>
    <div class="grid" id="charts"></div>
</div>
<script src="https://cdn.jsdelivr.net/npm/uplot@1.6.31/dist/uPlot.iife.min.js"></script>
<script>
const charts = {};

function toSeries(frame) {
    const xs = new Array(frame.samples.length);
    const ys = new Array(frame.samples.length);
    frame.samples.forEach((s, i) => { xs[i] = s.x / 1000; ys[i] = s.y; });
    return [xs, ys];
}

function createChart(channel) {
    const card = document.createElement('div');
    card.className = 'card';
    card.innerHTML = `<h2>${channel.label} (${channel.unit})</h2>`;
    const area = document.createElement('div');
    card.appendChild(area);
    document.getElementById('charts').appendChild(card);

    const opts = {
        width: area.clientWidth || 400,
        height: 220,
        scales: {
            x: { time: true },
            y: { range: [channel.axis_min, channel.axis_max] },
        },
        axes: [
            { stroke: '#94a3b8', grid: { stroke: 'rgba(255,255,255,0.03)' } },
            { stroke: '#94a3b8', grid: { stroke: 'rgba(255,255,255,0.03)' } },
        ],
        series: [
            {},
            { label: channel.label, stroke: channel.color, fill: channel.color.replace('0.95', '0.12'), points: { show: false } },
        ],
        legend: { show: false },
    };
    charts[channel.key] = new uPlot(opts, [[], []], area);
}

function applyFrame(frame) {
    const chart = charts[frame.channel];
    if (!chart) return;
    chart.batch(() => {
        chart.setData(toSeries(frame), false);
        chart.setScale('x', { min: frame.window_start / 1000, max: frame.window_end / 1000 });
    });
}

function showAlert(alert) {
    const el = document.getElementById('alert');
    const at = new Date(alert.timestamp).toLocaleTimeString();
    el.textContent = `Seismic alert: vibration magnitude ${alert.magnitude.toFixed(3)} at ${at}`;
    el.style.display = 'block';
}

async function refreshPushStatus() {
    const res = await fetch('/api/push/status');
    if (!res.ok) return;
    const status = await res.json();
    document.getElementById('push-status').textContent =
        status.armed ? 'alerts armed' : 'alerts off';
}

document.getElementById('report-btn').addEventListener('click', async (e) => {
    const btn = e.target;
    const box = document.getElementById('report');
    btn.disabled = true;
    btn.textContent = 'Loading…';
    try {
        const res = await fetch('/api/reports/generate', { method: 'POST' });
        const data = await res.json();
        if (!res.ok) throw new Error(data.error || `Server error: ${res.status}`);
        box.textContent = JSON.stringify(data, null, 2);
    } catch (err) {
        box.textContent = `Error: ${err.message}`;
    } finally {
        box.style.display = 'block';
        btn.disabled = false;
        btn.textContent = 'Generate report';
    }
});

async function init() {
    const channels = await (await fetch('/api/channels')).json();
    channels.forEach(createChart);
    refreshPushStatus();

    const source = new EventSource('/api/stream');
    source.onopen = () => { document.getElementById('connection').textContent = 'live'; };
    source.onerror = () => { document.getElementById('connection').textContent = 'reconnecting…'; };
    source.addEventListener('chart_frame', (e) => applyFrame(JSON.parse(e.data)));
    source.addEventListener('seismic_alert', (e) => showAlert(JSON.parse(e.data)));
}

init();
</script>
</body>
</html>
"##;
