//! HTML served to members

/// Page that measures the visit and posts the claim
pub fn verification_page(token: &str, guild_id: &str, captcha_question: Option<&str>) -> String {
    let captcha_block = match captcha_question {
        Some(question) => format!(
            r#"<div class="captcha">
            <label for="answer">{question}</label>
            <input id="answer" type="number" inputmode="numeric" autocomplete="off">
        </div>"#,
            question = escape_html(question)
        ),
        None => String::new(),
    };

    // Values handed to the script are JSON encoded
    let token_js = serde_json::to_string(token).unwrap_or_else(|_| "\"\"".to_string());
    let guild_js = serde_json::to_string(guild_id).unwrap_or_else(|_| "\"\"".to_string());

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Server Verification</title>
    <style>
        body {{
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            display: flex;
            justify-content: center;
            align-items: center;
            min-height: 100vh;
            margin: 0;
            background: linear-gradient(135deg, #667eea 0%, #764ba2 100%);
        }}
        .container {{
            background: white;
            padding: 40px;
            border-radius: 16px;
            box-shadow: 0 10px 40px rgba(0,0,0,0.2);
            text-align: center;
            max-width: 400px;
        }}
        h1 {{
            color: #333;
            margin-bottom: 10px;
        }}
        p {{
            color: #666;
            margin-bottom: 30px;
        }}
        .captcha {{
            margin-bottom: 20px;
        }}
        .captcha label {{
            display: block;
            font-weight: 600;
            margin-bottom: 10px;
        }}
        .captcha input {{
            font-size: 18px;
            padding: 8px;
            width: 120px;
            text-align: center;
        }}
        .verify-btn {{
            background: #5865F2;
            color: white;
            border: none;
            padding: 15px 30px;
            border-radius: 8px;
            font-weight: 600;
            font-size: 16px;
            cursor: pointer;
            transition: background 0.2s;
        }}
        .verify-btn:hover {{
            background: #4752C4;
        }}
        .verify-btn:disabled {{
            background: #999;
            cursor: default;
        }}
        .result {{
            margin-top: 20px;
            padding: 15px;
            border-radius: 8px;
            display: none;
        }}
        .result.ok {{
            display: block;
            background: #f0fff4;
            color: #276749;
        }}
        .result.fail {{
            display: block;
            background: #fff5f5;
            color: #c53030;
        }}
    </style>
</head>
<body>
    <div class="container">
        <h1>Verify You're Human</h1>
        <p>Take a moment to look around, then press the button to get access to the server.</p>
        {captcha_block}
        <button id="verify" class="verify-btn">Verify</button>
        <div id="result" class="result"></div>
    </div>
    <script>
        const TOKEN = {token_js};
        const GUILD_ID = {guild_js};
        const started = performance.now();
        let moves = 0, keys = 0, touches = 0, scrolls = 0;

        document.addEventListener('mousemove', () => moves++);
        document.addEventListener('keydown', () => keys++);
        document.addEventListener('touchstart', () => touches++);
        document.addEventListener('scroll', () => scrolls++);

        function behaviorScore() {{
            let score = 20;
            score += Math.min(moves, 40);
            score += Math.min(keys * 5, 20);
            score += Math.min(touches * 10, 40);
            score += Math.min(scrolls * 2, 10);
            if (document.hasFocus()) score += 10;
            return Math.min(score, 100);
        }}

        document.getElementById('verify').addEventListener('click', async (event) => {{
            const button = event.target;
            const result = document.getElementById('result');
            button.disabled = true;

            const body = {{
                token: TOKEN,
                guildId: GUILD_ID,
                timeSpent: (performance.now() - started) / 1000,
                behaviorScore: behaviorScore(),
            }};
            const answer = document.getElementById('answer');
            if (answer) {{
                const value = parseInt(answer.value, 10);
                if (!Number.isNaN(value)) body.captchaAnswer = value;
            }}

            try {{
                const response = await fetch('/api/verification/complete', {{
                    method: 'POST',
                    headers: {{ 'Content-Type': 'application/json' }},
                    body: JSON.stringify(body),
                }});
                const data = await response.json();
                result.className = 'result ' + (data.success ? 'ok' : 'fail');
                result.textContent = data.message;
                if (!data.success) button.disabled = false;
            }} catch (e) {{
                result.className = 'result fail';
                result.textContent = 'Could not reach the server. Please try again.';
                button.disabled = false;
            }}
        }});
    </script>
</body>
</html>"#,
        captcha_block = captcha_block,
        token_js = token_js,
        guild_js = guild_js
    )
}

pub fn error_page(message: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Verification Error</title>
    <style>
        body {{
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            display: flex;
            justify-content: center;
            align-items: center;
            min-height: 100vh;
            margin: 0;
            background: linear-gradient(135deg, #f093fb 0%, #f5576c 100%);
        }}
        .container {{
            background: white;
            padding: 40px;
            border-radius: 16px;
            box-shadow: 0 10px 40px rgba(0,0,0,0.2);
            text-align: center;
            max-width: 400px;
        }}
        h1 {{
            color: #f5576c;
        }}
        .message {{
            background: #fff5f5;
            padding: 15px;
            border-radius: 8px;
            color: #c53030;
            margin: 20px 0;
        }}
    </style>
</head>
<body>
    <div class="container">
        <h1>Verification Unavailable</h1>
        <div class="message">{message}</div>
        <p style="color: #888; font-size: 14px;">Please try again or contact a moderator.</p>
    </div>
</body>
</html>"#,
        message = escape_html(message)
    )
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_embeds_claim_fields() {
        let page = verification_page("tok-1", "100", None);
        assert!(page.contains(r#"const TOKEN = "tok-1";"#));
        assert!(page.contains(r#"const GUILD_ID = "100";"#));
        assert!(page.contains("/api/verification/complete"));
        assert!(!page.contains("id=\"answer\""));
    }

    #[test]
    fn test_page_shows_captcha_question() {
        let page = verification_page("tok-1", "100", Some("What is 3 + 4?"));
        assert!(page.contains("What is 3 + 4?"));
        assert!(page.contains("id=\"answer\""));
    }

    #[test]
    fn test_error_page_escapes_message() {
        let page = error_page("<script>");
        assert!(page.contains("&lt;script&gt;"));
    }
}
